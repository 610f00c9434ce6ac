// Candidate analysis: the four-stage pipeline, its tools, output extraction and scoring.

pub mod calculator;
pub mod extraction;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
pub mod stages;
pub mod tools;
