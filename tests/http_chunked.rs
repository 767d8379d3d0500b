//! `ResponseFramer` isn't wired to a live socket anywhere in this
//! crate yet (component O is a standalone framer, driven by whatever
//! transport feeds it bytes), so this scenario exercises its public
//! API directly: a chunked response arriving in arbitrary-sized
//! fragments must reassemble into one complete body.

use netgen::http::{FramerState, ResponseFramer};

#[test]
fn chunked_response_reassembles_across_fragmented_feeds() {
    let mut framer = ResponseFramer::new();

    assert!(framer.feed(b"HTTP/1.1 200 OK\r\n").unwrap().is_none());
    assert!(framer
        .feed(b"Transfer-Encoding: chunked\r\n\r\n")
        .unwrap()
        .is_none());
    assert!(framer.feed(b"4\r\nWiki\r\n").unwrap().is_none());
    assert!(framer.feed(b"5\r\npedia\r\n").unwrap().is_none());
    let resp = framer.feed(b"0\r\n\r\n").unwrap().unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"Wikipedia");
    assert_eq!(framer.state(), FramerState::Done);
}

#[test]
fn pipelined_chunked_and_content_length_responses_both_drain() {
    let mut framer = ResponseFramer::new();
    framer.note_request_sent();

    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\nHTTP/1.1 304 Not Modified\r\nContent-Length: 0\r\n\r\n";
    let first = framer.feed(raw).unwrap().unwrap();
    assert_eq!(first.body, b"abc");
    assert_eq!(framer.state(), FramerState::WaitStatus);

    let second = framer.feed(b"").unwrap().unwrap();
    assert_eq!(second.status, 304);
    assert_eq!(framer.state(), FramerState::Done);
}
