pub(crate) mod public;
pub(crate) mod r#static;
