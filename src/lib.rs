/*! Construction, serialization, and parsing of layered network datagrams.

`wiregram` gives tools that craft raw frames (scanners, probes, fuzzers)
bit-exact control over the wire layout of link, network, and transport
headers. Three pieces cooperate:

 * The [bitfield] module turns a record described as an ordered list of
   bit-width-constrained fields into a big-endian wire image and back,
   and enumerates the fields for formatting. See
   [BitFieldGroup](bitfield::BitFieldGroup).
 * The [wire] module is the catalog of concrete records: Ethernet header
   and footer, IPv4, ICMP, UDP and TCP headers, the address leaves they
   are built from, and the [Full](wire::Full) datagram that aggregates a
   whole frame and computes lengths, checksums, and the CRC in
   dependency order.
 * [PrettyPrinter](pretty_print::PrettyPrinter) renders any record as an
   RFC-style bit diagram.

```rust
use wiregram::wire::{Full, Ipv4Address, Port};
use wiregram::bitfield::BitFieldGroup;

let mut dgram = Full::init(3, &["ip", "udp"], b"Hello World!".to_vec(), "eth").unwrap();
dgram.set_endpoints(
    Ipv4Address([10, 0, 0, 1]),
    Ipv4Address([10, 0, 0, 2]),
    Port(1024),
    Port(1025),
);
dgram.calc_from_payload().unwrap();

let bytes = dgram.as_net_bytes().unwrap();
assert_eq!(bytes.len() % 4, 0);

let parsed = Full::from_net_bytes(&bytes).unwrap();
assert_eq!(parsed.payload[..12], b"Hello World!"[..]);
```

The crate never touches a socket: sending and receiving the emitted
bytes is the caller's business.
*/

#[macro_use]
mod macros;

pub mod bitfield;
pub mod parsers;
pub mod pretty_print;
pub mod wire;
