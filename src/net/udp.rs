//! UDP datagram framing. The distilled spec dispatches UDP datagrams to
//! a management ring rather than processing them in the worker's FSM
//! (there is no UDP connection state in this engine); what's here is the
//! wire-format build/parse those call sites need, plus the pseudo-header
//! checksum UDP shares with TCP.

use crate::checksum;

pub const UDP_HDR_LEN: usize = 8;

pub struct UdpView<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

pub fn parse(data: &[u8]) -> Option<UdpView<'_>> {
    if data.len() < UDP_HDR_LEN {
        return None;
    }
    let length = u16::from_be_bytes([data[4], data[5]]) as usize;
    if length > data.len() || length < UDP_HDR_LEN {
        return None;
    }
    Some(UdpView {
        src_port: u16::from_be_bytes([data[0], data[1]]),
        dst_port: u16::from_be_bytes([data[2], data[3]]),
        payload: &data[UDP_HDR_LEN..length],
    })
}

pub fn build(src_ip: u32, dst_ip: u32, src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = (UDP_HDR_LEN + payload.len()) as u16;
    let mut v = vec![0u8; UDP_HDR_LEN + payload.len()];
    v[0..2].copy_from_slice(&src_port.to_be_bytes());
    v[2..4].copy_from_slice(&dst_port.to_be_bytes());
    v[4..6].copy_from_slice(&length.to_be_bytes());
    v[UDP_HDR_LEN..].copy_from_slice(payload);

    let pseudo = checksum::ipv4_pseudo_header_sum(src_ip, dst_ip, super::ipv4::PROTO_UDP, length);
    let cksum = checksum::fold(pseudo + checksum::partial_sum(&v));
    let cksum = if cksum == 0 { 0xFFFF } else { cksum };
    v[6..8].copy_from_slice(&cksum.to_be_bytes());
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_roundtrips() {
        let pkt = build(0x0a000001, 0x0a000002, 4000, 53, b"query");
        let view = parse(&pkt).unwrap();
        assert_eq!(view.src_port, 4000);
        assert_eq!(view.dst_port, 53);
        assert_eq!(view.payload, b"query");
    }
}
