// ─── YAMCL Core ───
// Local package manager for game binaries, libraries and assets.
//
// Architecture:
//   core/
//     storage/   : Data-directory paths + atomic JSON writes
//     remote/    : Remote origins + HTTP store
//     platform   : Family / arch of the running machine
//     version/   : Version list, manifests, OS rules
//     maven/     : Coordinate to path mapping
//     downloader/: Verified downloads + native extraction
//     registry/  : Generic on-disk index
//     binary/    : Installed game versions
//     library/   : Library resolution, index and acquisition
//     assets/    : Asset indexes + objects
//     profile/   : Game directories
//     launch/    : Classpath + arguments + java command
//     auth/      : Offline account fields
//     state/     : Configuration + application state

pub mod assets;
pub mod auth;
pub mod binary;
pub mod downloader;
pub mod error;
pub mod launch;
pub mod library;
pub mod maven;
pub mod platform;
pub mod profile;
pub mod registry;
pub mod remote;
pub mod state;
pub mod storage;
pub mod version;
