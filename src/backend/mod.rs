use log::{debug, info};
use rusqlite::{
    params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior,
};
use serde::Serialize;
use std::path::Path;

use crate::error::{ClipperError, Result};

mod checkpoint;
mod core_types;
mod database;
mod resume;
mod search;

use database::*;

pub use checkpoint::CheckpointStore;
pub use core_types::*;
pub use resume::plan_resume;
pub use search::{search_gifs, SearchHit};
