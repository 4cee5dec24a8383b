// Library exports for plasmid-recon
pub mod aggregate;
pub mod circular;
pub mod classify;
pub mod cluster;
pub mod contig;
pub mod error;
pub mod evidence;
pub mod filter;
pub mod hits;
pub mod mash;
pub mod namer;
pub mod overlap;
pub mod pipeline;
pub mod report;
pub mod seqio;
