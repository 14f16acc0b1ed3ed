pub mod draft;
pub mod form;
pub mod record;
pub mod snapshot;
