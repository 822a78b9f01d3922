use bytes::Bytes;

const HEADER_LEN: usize = 12;
const MAX_POINTER_JUMPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Dotted name, lowercased so that 0x20-randomised names compare equal
    pub name: Bytes,
    pub qtype: u16,
    pub qclass: u16,
}

/// The parts of a DNS message needed to pair an answer with its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: u16,
    pub is_response: bool,
    pub questions: Vec<Question>,
}

impl MessageSummary {
    /// Parse DNS message header and question section (RFC 1035 Section 4.1)
    ///
    /// DNS Header Format (12 bytes):
    /// ```text
    ///  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |                      ID                       |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |                    QDCOUNT                    |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |                    ANCOUNT                    |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |                    NSCOUNT                    |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// |                    ARCOUNT                    |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// ```
    ///
    /// Each question is a name followed by QTYPE (2 bytes) and QCLASS (2 bytes).
    /// Returns `None` when the header or any question runs past the buffer.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let flags = u16::from_be_bytes([data[2], data[3]]);
        let qd_count = u16::from_be_bytes([data[4], data[5]]);

        let mut offset = HEADER_LEN;
        let mut questions = Vec::new();
        for _ in 0..qd_count {
            let name = parse_domain_name(data, &mut offset)?;
            let fixed = data.get(offset..offset + 4)?;
            questions.push(Question {
                name,
                qtype: u16::from_be_bytes([fixed[0], fixed[1]]),
                qclass: u16::from_be_bytes([fixed[2], fixed[3]]),
            });
            offset += 4;
        }

        Some(Self {
            id,
            is_response: flags & 0x8000 != 0,
            questions,
        })
    }
}

/// Whether `reply` is a response to `query`: QR set, same ID, same questions.
///
/// A query that cannot be parsed offers nothing to compare against, so any
/// reply is accepted for it.
pub fn is_answer_to(query: &[u8], reply: &[u8]) -> bool {
    let Some(query) = MessageSummary::parse(query) else {
        return true;
    };
    match MessageSummary::parse(reply) {
        Some(reply) => {
            reply.is_response && reply.id == query.id && reply.questions == query.questions
        }
        None => false,
    }
}

/// Parse DNS domain name with compression support (RFC 1035 Section 4.1.4)
///
/// Labels are a length octet followed by that many octets, ending with a zero
/// octet. A length with the top two bits set (0xC0) is a 14-bit pointer to an
/// earlier name in the message. At most 10 pointers are followed.
///
/// On success `offset` is left just past the name as it appears at the
/// original position (after the first pointer, if one was followed).
fn parse_domain_name(data: &[u8], offset: &mut usize) -> Option<Bytes> {
    let mut name = Vec::new();
    let mut pos = *offset;
    let mut resume_at = None;
    let mut jumps = 0;

    loop {
        let len = *data.get(pos)? as usize;

        if len == 0 {
            pos += 1;
            break;
        }

        if len & 0xC0 == 0xC0 {
            let low = *data.get(pos + 1)? as usize;
            if resume_at.is_none() {
                resume_at = Some(pos + 2);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return None;
            }
            pos = ((len & 0x3F) << 8) | low;
            continue;
        }

        // RFC 1035 Section 2.3.4: labels must be 63 octets or less
        if len > 63 {
            return None;
        }

        let label = data.get(pos + 1..pos + 1 + len)?;
        if !name.is_empty() {
            name.push(b'.');
        }
        name.extend(label.iter().map(u8::to_ascii_lowercase));
        pos += 1 + len;
    }

    *offset = resume_at.unwrap_or(pos);
    Some(Bytes::from(name))
}
