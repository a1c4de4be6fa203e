/* 📖 # What is the Platform Abstraction Layer?

The PAL hides every side effect the viewer and the server need behind one trait:
reading and writing files, binding an HTTP listener and issuing outbound HTTP requests.

- RealPal talks to std::fs, tiny_http and reqwest
- MockPal keeps files in memory, dispatches simulated requests straight to the service
  and answers outbound fetches from scripted responses

Code above the PAL depends only on the trait, so the whole proxy and archive pipeline
can be tested without touching the disk or the network.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle, ReadSeek};
