// ─── Ether Core ───
// Backend for a local game library: install bundles from a URL, launch them
// in a window or as a native process, and track what is running.
//
// Architecture:
//   core/
//     downloader/ : Streaming HTTP transfer with progress ticks
//     archive/    : Zip extraction with polled progress
//     install/    : Install pipeline, progress events, install service
//     bundle/     : Per-bundle manifest.json reader
//     launch/     : Launch manager, window host, native processes
//     registry/   : Keyed exclusive-operation guard
//     state/      : Settings + global application state

pub mod archive;
pub mod bundle;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod launch;
pub mod registry;
pub mod state;
