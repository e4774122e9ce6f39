// src/parser.rs
use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::models::{Currency, TipEvent};
use crate::rpc::Log;

fn topic_to_address(topic: &str) -> Option<Address> {
    // topics[1] and topics[2] are 32-byte (padded) hex strings; address is the last 20 bytes
    let s = topic.trim_start_matches("0x");
    let bytes = hex::decode(s).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let addr_bytes: [u8; 20] = bytes[12..32].try_into().ok()?;
    Some(Address::from(addr_bytes))
}

fn word(bytes: &[u8], index: usize) -> Option<&[u8]> {
    bytes.get(index * 32..(index + 1) * 32)
}

fn word_to_usize(word: &[u8]) -> Option<usize> {
    // offsets and lengths fit in the low 8 bytes of a word
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let tail: [u8; 8] = word[24..32].try_into().ok()?;
    usize::try_from(u64::from_be_bytes(tail)).ok()
}

/// Non-indexed fields of a tip event: one uint256 word (amount), then an
/// offset word pointing at the string's length + contents.
fn decode_amount_and_message(data: &str) -> Option<(U256, String)> {
    let bytes = hex::decode(data.trim_start_matches("0x")).ok()?;
    let amount = U256::from_be_slice(word(&bytes, 0)?);
    let offset = word_to_usize(word(&bytes, 1)?)?;
    let length_end = offset.checked_add(32)?;
    let len = word_to_usize(bytes.get(offset..length_end)?)?;
    let raw = bytes.get(length_end..length_end.checked_add(len)?)?;
    Some((amount, String::from_utf8_lossy(raw).into_owned()))
}

/// Decode a single log into a `TipEvent`. Malformed records yield `None`
/// and are dropped by the caller; one bad log never aborts a pass.
pub fn decode_tip(log: &Log, currency: Currency) -> Option<TipEvent> {
    if log.topics.len() < 3 {
        debug!(
            "Skipping log with {} topics (tx {})",
            log.topics.len(),
            log.tx_hash
        );
        return None;
    }

    let from = topic_to_address(&log.topics[1])?;
    // recipient is always the streamer wallet; validated, not carried
    topic_to_address(&log.topics[2])?;

    let (amount, message) = decode_amount_and_message(&log.data)?;

    let block_number =
        u64::from_str_radix(log.block_number_hex.trim_start_matches("0x"), 16).ok()?;
    let log_index =
        u64::from_str_radix(log.log_index_hex.trim_start_matches("0x"), 16).unwrap_or(0);

    Some(TipEvent {
        from,
        amount,
        currency,
        message,
        block_number,
        log_index,
        tx_hash: log.tx_hash.clone(),
        timestamp: None,
    })
}
