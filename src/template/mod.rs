// src/template/mod.rs

//! Entry-script generation for worker processes.
//!
//! Rendering is pure: the same dependency list always produces the same
//! script text, so it can be tested by matching fragments.

pub mod node;

use crate::deps::DependencyDescriptor;

pub use node::NodeTemplateRenderer;

/// Produces the source of the worker's entry script.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, dependencies: &[DependencyDescriptor]) -> String;
}
