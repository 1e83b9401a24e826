/*
 * 5D Labs Namespace Reaper
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Namespace reaper library
//!
//! Periodically lists the cluster's namespaces and deletes the ones whose expiry
//! annotation (unix seconds) has passed. Protected system namespaces and names
//! outside the optional allow-pattern are never touched.

pub mod config;
pub mod cycle;
pub mod expiry;
pub mod filter;
pub mod scheduler;
pub mod source;
pub mod telemetry;

// Re-export commonly used types
pub use config::{CycleConfig, ReaperSettings, PROTECTED_NAMESPACES};
pub use cycle::{run_cycle, CycleError, CycleReport, NamespaceOutcome};
pub use expiry::{evaluate, Expiry, ExpiryParseError};
pub use filter::{exemption, Exemption};
pub use scheduler::Scheduler;
pub use source::{KubeNamespaces, Namespace, NamespaceDeleter, NamespaceSource, SourceError};
