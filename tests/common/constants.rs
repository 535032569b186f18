//! Test constants

#![allow(dead_code)]

pub const RAW_TABLE: &str = "raw_data";
pub const STAGING_TABLE: &str = "staging";
pub const PROCESSED_TABLE: &str = "processed";

pub const LOVE_TEXT: &str = "Absolutely love this sweater, fits perfectly";
pub const HATE_TEXT: &str = "Fabric pilled after one wash, very disappointed";
pub const MEH_TEXT: &str = "It is a dress. Nothing special";
pub const FLAKY_TEXT: &str = "The zipper is fine I guess";

pub const KNITS: &str = "Knits";
pub const DRESSES: &str = "Dresses";
