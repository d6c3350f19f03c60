pub mod regularize;
pub mod run;
pub mod stations;

pub use regularize::regularize;
pub use run::run;
pub use stations::stations;
