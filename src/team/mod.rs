//! Team roster logic: display ordering, yearly roles and display categories.

mod category;
pub mod ordering;
pub mod roles;

pub use category::{categorize, Category};
pub use ordering::{sort_for_display, OrderBoard};
pub use roles::{reconcile_yearly_roles, TeamYearsEditor, TeamYearsPayload, YearlyRoleDraft};
