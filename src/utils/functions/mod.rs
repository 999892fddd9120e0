pub mod base;
pub mod get_weather;
pub mod return_error;

pub use base::{
  FunctionCall, FunctionCallError, FunctionDeclaration, FunctionDeclarationName, FunctionOutput,
  FUNCTIONS,
};
