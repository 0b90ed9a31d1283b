use rand::Rng;
use time::OffsetDateTime;

pub const TICKET_PREFIX: &str = "TKT";
const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `TKT-<unix millis>-<9 uppercase base-36 chars>`.
///
/// Uniqueness is enforced by the `tickets.ticket_number` constraint, not here.
pub fn generate_ticket_number() -> String {
    generate_at(OffsetDateTime::now_utc(), &mut rand::rng())
}

pub fn generate_at<R: Rng + ?Sized>(now: OffsetDateTime, rng: &mut R) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{TICKET_PREFIX}-{millis}-{suffix}")
}

pub fn is_well_formed(number: &str) -> bool {
    let mut parts = number.splitn(3, '-');
    let (Some(prefix), Some(millis), Some(suffix)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == TICKET_PREFIX
        && !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() >= 5
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}
