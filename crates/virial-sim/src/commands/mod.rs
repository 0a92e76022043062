pub mod reference;
pub mod run;
