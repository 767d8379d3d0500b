//! Ethernet II / 802.1Q framing — the classification point every worker
//! tick starts from (§4.13 step 2).

pub const MAC_LEN: usize = 6;
pub const ETH_HDR_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// Parsed Ethernet header, with the VLAN tag (if any) peeled off
/// separately so the dispatcher always sees the real payload EtherType.
pub struct EthView {
    pub dst: [u8; MAC_LEN],
    pub src: [u8; MAC_LEN],
    pub ethertype: u16,
    pub vlan_id: Option<u16>,
    /// Byte offset of the payload after the Ethernet (and VLAN) header.
    pub payload_offset: usize,
}

/// Parse an Ethernet header, transparently stepping over a single
/// 802.1Q tag if present.
pub fn parse(data: &[u8]) -> Option<EthView> {
    if data.len() < ETH_HDR_LEN {
        return None;
    }
    let mut dst = [0u8; MAC_LEN];
    let mut src = [0u8; MAC_LEN];
    dst.copy_from_slice(&data[0..6]);
    src.copy_from_slice(&data[6..12]);
    let mut ethertype = u16::from_be_bytes([data[12], data[13]]);
    let mut offset = ETH_HDR_LEN;
    let mut vlan_id = None;

    if ethertype == ETHERTYPE_VLAN {
        if data.len() < ETH_HDR_LEN + VLAN_TAG_LEN {
            return None;
        }
        let tci = u16::from_be_bytes([data[14], data[15]]);
        vlan_id = Some(tci & 0x0FFF);
        ethertype = u16::from_be_bytes([data[16], data[17]]);
        offset = ETH_HDR_LEN + VLAN_TAG_LEN;
    }

    Some(EthView { dst, src, ethertype, vlan_id, payload_offset: offset })
}

/// Build a plain (untagged) Ethernet header.
pub fn build(dst: [u8; MAC_LEN], src: [u8; MAC_LEN], ethertype: u16) -> [u8; ETH_HDR_LEN] {
    let mut hdr = [0u8; ETH_HDR_LEN];
    hdr[0..6].copy_from_slice(&dst);
    hdr[6..12].copy_from_slice(&src);
    hdr[12..14].copy_from_slice(&ethertype.to_be_bytes());
    hdr
}

pub const BROADCAST_MAC: [u8; MAC_LEN] = [0xff; MAC_LEN];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_roundtrips() {
        let hdr = build([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1], ETHERTYPE_IPV4);
        let view = parse(&hdr).unwrap();
        assert_eq!(view.dst, [1, 2, 3, 4, 5, 6]);
        assert_eq!(view.src, [6, 5, 4, 3, 2, 1]);
        assert_eq!(view.ethertype, ETHERTYPE_IPV4);
        assert!(view.vlan_id.is_none());
        assert_eq!(view.payload_offset, ETH_HDR_LEN);
    }

    #[test]
    fn vlan_tagged_frame_is_peeled() {
        let mut frame = build([1; 6], [2; 6], ETHERTYPE_VLAN).to_vec();
        frame.extend_from_slice(&100u16.to_be_bytes()); // VLAN id 100
        frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        let view = parse(&frame).unwrap();
        assert_eq!(view.vlan_id, Some(100));
        assert_eq!(view.ethertype, ETHERTYPE_IPV4);
        assert_eq!(view.payload_offset, ETH_HDR_LEN + VLAN_TAG_LEN);
    }

    #[test]
    fn truncated_frame_rejected() {
        assert!(parse(&[0u8; 10]).is_none());
    }
}
