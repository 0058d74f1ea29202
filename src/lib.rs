//! # nextport
//!
//! Motor de conversión de proyectos Next.js a react-router + Vite, con los
//! handlers de `pages/api` re-emitidos para Express, Fastify o Hono.

pub mod api;
pub mod ast;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod files;
pub mod middleware;
pub mod orchestrator;
pub mod project;
pub mod report;
pub mod routes;
pub mod rules;
pub mod scan;
pub mod stats;
pub mod ui;

pub use config::ConversionOptions;
pub use orchestrator::{ConversionResult, Converter, DiskFile, FileSource, SourceFile};
