/*!
 * # kvbridge - Command Core for Key-Value Store Clients
 *
 * kvbridge sits between a host binding and a transport that talks to a
 * Redis-compatible store. It turns typed calls into wire arguments and
 * turns replies back into host values:
 * - Typed commands with sparse options and optional cluster routes
 * - Per-family argument grammars with a fixed option token order
 * - Reply decoding with selectable association modes
 * - Client-side batching for MULTI/EXEC and pipelines, all or nothing
 * - A RESP3 reply parser and a blocking TCP transport
 *
 * ## Core Modules
 *
 * ### Commands (`command`, `args`)
 * - `Command`: kind, key, positional arguments, `Options` and `Route`
 * - `build()`: renders a command into `WireArgs` by its `Shape`
 * - `codec`: the text form of integers, floats and booleans
 *
 * ### Replies (`response`, `processor`)
 * - `ResponseValue`: the reply tree handed back by a transport
 * - `decode()`: folds a reply into a `HostValue` under an `AssociationMode`
 * - `Processor`: the per-command choice of decoding
 *
 * ### Execution (`dispatch`, `batch`, `transport`)
 * - `execute()`: build, send or queue, decode
 * - `BatchState`: the Idle/Active machine behind `multi`/`pipeline`/`exec`
 * - `Transport`: the boundary; `ScriptedTransport` replays canned replies,
 *   `TcpTransport` speaks RESP over a socket
 *
 * ### Ambient (`config`, `logger`)
 * - `ClientConfig`: JSON configuration
 * - `logger::init()`: a `log` sink for files or stderr
 */

pub mod args;
pub mod batch;
pub mod codec;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod processor;
pub mod resp3;
pub mod response;
pub mod route;
pub mod tcp;
pub mod transport;

// Make common types available at the crate root
pub use args::{Shape, WireArgs, build};
pub use batch::{BatchHandle, BatchMode, BatchState, BufferedCommand};
pub use command::*;
pub use config::{ClientConfig, NodeAddress};
pub use dispatch::{Client, Reply, execute, execute_with};
pub use error::*;
pub use processor::{Processor, key_type};
pub use response::*;
pub use route::{Route, SimpleRoute};
pub use tcp::TcpTransport;
pub use transport::{Call, ScriptedTransport, Transport};
