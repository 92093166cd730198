// Library root
// -----------
// The binary (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `config`: builds the immutable `Config` from a JSON file and the
//   environment.
// - `api`: the blocking HTTP client that posts picture bytes to the
//   prediction endpoint.
// - `pictures`: flat directory listing and whole-file reads.
// - `ui`: the directory prompt and the sequential upload loop.
pub mod api;
pub mod config;
pub mod pictures;
pub mod ui;
