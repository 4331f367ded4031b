// ABOUTME: The three built-in language runner implementations

pub mod csharp;
pub mod node;
pub mod python;

mod shared;
