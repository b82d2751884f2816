//! # Recipe Cards
//!
//! Turns photographed recipe cards into a searchable JSON collection.
//!
//! Each card is two `.webp` photos in a flat directory
//! (`<vendor>_<key>_front.webp` / `<vendor>_<key>_back.webp`). The `extract`
//! batch sends every front image the store does not know yet to a multimodal
//! model, decodes the JSON it returns, and appends the record to
//! `data.json`. The `serve` command exposes the images and the store to the
//! local network.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │ scanner  │──▶│  prompt  │──▶│ extractor│──▶│ normalize │──▶│  store   │
//! │ images/  │   │  vendor  │   │  Gemini  │   │ fence/JSON│   │data.json │
//! └──────────┘   └──────────┘   └──────────┘   └───────────┘   └────┬─────┘
//!                                                                   │
//!                                                              ┌────▼─────┐
//!                                                              │  server  │
//!                                                              └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cards init                 # create an empty data.json
//! cards extract --dry-run    # show pending cards
//! cards extract              # extract them (GOOGLE_API_KEY must be set)
//! cards list --vendor hf
//! cards serve                # browse on http://<host>:8080
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Recipe records |
//! | [`store`] | In-memory store and persistence port |
//! | [`scanner`] | Image directory scanning |
//! | [`prompt`] | Vendor classification and request assembly |
//! | [`extractor`] | Extraction service clients |
//! | [`normalize`] | Response cleanup and decoding |
//! | [`pipeline`] | Batch orchestration |
//! | [`catalog`] | `list` / `show` |
//! | [`server`] | Static file server |

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod scanner;
pub mod server;
pub mod store;
