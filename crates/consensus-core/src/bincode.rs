use bincode::config;

pub const STANDARD_LIMIT_16M: usize = 0x1_0000_0000;

/// The canonical encoding used to hash and sign every consensus-core type.
///
/// All hashing and signing goes through this single configuration so that
/// two honest nodes always derive byte-identical hashes for the same
/// logical value (spec property: deterministic consensus).
pub const CONSENSUS_BINCODE_CONFIG: config::Configuration<
    config::BigEndian,
    config::Varint,
    config::Limit<STANDARD_LIMIT_16M>,
> = config::standard()
    .with_limit::<STANDARD_LIMIT_16M>()
    .with_big_endian()
    .with_variable_int_encoding();
