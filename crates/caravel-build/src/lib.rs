//! Bundling, artifact management, and Dockerfile generation for caravel.
//!
//! # Build flow
//!
//! ```text
//! caravel run / caravel deploy
//!   1. Bundle     ── esbuild <entry> --bundle --outdir=dist.tmp/
//!   2. Aux files  ── .env copied verbatim into the staging dir
//!   3. Swap       ── dist/ removed, dist.tmp/ renamed to dist/
//! ```
//!
//! # Artifact discipline
//!
//! `dist/` is only ever replaced wholesale. The bundler writes into a
//! staging directory, and the swap happens after the bundler has
//! succeeded — a reader of `dist/` sees the previous artifact, the new
//! artifact, or nothing, never a half-written tree. A failed bundle
//! leaves the previous artifact in place.

pub mod artifact;
pub mod bundler;
pub mod dockerfile;

pub use artifact::{ArtifactBuilder, BuildError};
pub use bundler::{BundleSpec, Bundler, BundlerError, EsbuildBundler};
pub use dockerfile::DockerfileGenerator;
