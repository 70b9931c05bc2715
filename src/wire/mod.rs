/*! The frame and packet catalog.

The `wire` module holds the concrete records built on the
[bitfield](crate::bitfield) engine: Ethernet header and footer, IPv4,
ICMP, UDP, and TCP headers, the address leaves they are made of, and the
[Full] datagram aggregating layer 2 through the payload.

Every record here follows the same contract:

 * `fields()` declares the wire layout; `as_net_bytes` emits it in
   network byte order.
 * `from_net_bytes` recovers a value from such an image.
 * Headers whose fields derive from an assembled payload (lengths,
   checksums, the CRC) additionally implement [DerivedFields]; the
   aggregator invokes those hooks bottom-up.

The catalog does not police protocol semantics. It will happily emit an
IPv4 header with a nonsensical protocol number; only the derived fields
are computed for the caller.
*/

use core::fmt;

pub(crate) mod datagram;
pub(crate) mod ethernet;
pub(crate) mod icmp;
pub(crate) mod ip;
pub(crate) mod ipv4;
pub(crate) mod tcp;
pub(crate) mod udp;

pub use self::datagram::{Full, LinkFooter, LinkHeader, NetHeader, TransportHeader};
pub use self::ethernet::{
    Address as EthernetAddress, EtherType, Footer as EthernetFooter, Header as EthernetHeader,
};
pub use self::icmp::{Message as IcmpMessage, Packet as IcmpPacket};
pub use self::ip::{checksum, Port, Pseudo};
pub use self::ipv4::{Address as Ipv4Address, Header as Ipv4Header, Protocol as IpProtocol};
pub use self::tcp::Header as TcpHeader;
pub use self::udp::Header as UdpHeader;

/// Everything that can go wrong constructing, emitting, or parsing a
/// record. Errors are returned to the caller; the library never
/// terminates the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A string did not parse as an IPv4 address or address expression.
    InvalidIpv4String,
    /// A string did not parse as a MAC address.
    InvalidMacString,
    /// A CIDR prefix above 31 was given to subnet enumeration.
    CidrTooLarge,
    /// A string did not parse as a `start[-end]` range.
    InvalidRangeString,
    /// A parse ran out of input.
    InsufficientBytes,
    /// An externally supplied discriminator matched no variant arm.
    UnknownVariantTag,
    /// A header tag named no known header variant.
    InvalidHeader,
    /// A footer tag named no known footer variant.
    InvalidFooter,
    /// A field value does not fit its declared width, or the width is
    /// outside `1..=64`.
    InvalidWidth,
    /// A byte-string field sat at a non-byte-aligned bit position.
    UnalignedPayload,
    /// The record exposes no in-memory image operation.
    NoAsBytesMethod,
    /// The record exposes no derived-field computation.
    NoCalcMethod,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Error::InvalidIpv4String => "invalid IPv4 address string",
            Error::InvalidMacString => "invalid MAC address string",
            Error::CidrTooLarge => "CIDR prefix too large for enumeration",
            Error::InvalidRangeString => "invalid range string",
            Error::InsufficientBytes => "insufficient bytes",
            Error::UnknownVariantTag => "unknown variant tag",
            Error::InvalidHeader => "invalid header tag",
            Error::InvalidFooter => "invalid footer tag",
            Error::InvalidWidth => "value does not fit field width",
            Error::UnalignedPayload => "byte string at unaligned bit position",
            Error::NoAsBytesMethod => "record has no in-memory image",
            Error::NoCalcMethod => "record has no derived-field method",
        };
        write!(f, "{reason}")
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

/// Capability hooks for headers whose fields derive from an assembled
/// payload.
///
/// A header overrides the hook it supports; the others keep the default
/// `Err(NoCalcMethod)` answer, which is how the [Full] aggregator
/// detects capabilities. A header overriding none of them is valid and
/// is simply skipped.
pub trait DerivedFields {
    /// Fill in length and checksum fields from the payload. Transport
    /// headers sum the pseudo-header when one is supplied; ICMP passes
    /// `None` and sums header + payload only.
    fn calc_length_and_checksum(&mut self, pseudo: Option<&Pseudo>, payload: &[u8]) -> Result<()> {
        let _ = (pseudo, payload);
        Err(Error::NoCalcMethod)
    }

    /// Fill in the total length and the header-only checksum from the
    /// payload (IPv4).
    fn calc_length_and_header_checksum(&mut self, payload: &[u8]) -> Result<()> {
        let _ = payload;
        Err(Error::NoCalcMethod)
    }

    /// Fill in a CRC over the frame bytes preceding this record
    /// (Ethernet footer).
    fn calc_crc(&mut self, frame: &[u8]) -> Result<()> {
        let _ = frame;
        Err(Error::NoCalcMethod)
    }
}
