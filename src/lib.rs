//! Local gene annotation engine.
//!
//! A gene list ([`input::GeneTable`]) is annotated against every dataset of a
//! [`config::ResolvedConfig`]: each edge file is indexed by gene once
//! ([`index::DatasetIndex`]), shaped per output mode ([`shaper`]) and merged
//! into one wide delimited row per input row ([`merge`]).

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod input;
pub mod merge;
pub mod output;
pub mod shaper;
