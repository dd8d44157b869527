pub mod code_runner;
pub mod db;

pub use code_runner::ProcessCodeRunner;
pub use db::DbAdapter;
