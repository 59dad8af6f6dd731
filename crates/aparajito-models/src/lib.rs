pub mod gateway;
pub mod layout;
pub mod track;
