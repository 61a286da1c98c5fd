//! Lua scripts for guarded Redis writes.
//!
//! Redis runs a script atomically, so the compare and the write cannot
//! interleave with another client's commands.

/// Compare-and-set on a single hash field.
///
/// Arguments:
/// - KEYS[1]: Hash key (e.g., `meta:{roomId}`)
/// - ARGV[1]: Guard field name (e.g., `version`)
/// - ARGV[2]: `1` if the guard field is expected to exist, `0` if it must be absent
/// - ARGV[3]: Expected guard value (ignored when ARGV[2] is `0`)
/// - ARGV[4..]: Field-value pairs to write
///
/// Returns:
/// - 1: Write applied
/// - 0: Hash missing or guard value changed
pub const HASH_SET_IF: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end

local current = redis.call('HGET', KEYS[1], ARGV[1])

if ARGV[2] == '1' then
    if current ~= ARGV[3] then
        return 0
    end
elseif current then
    return 0
end

local fields = {}
for i = 4, #ARGV do
    fields[#fields + 1] = ARGV[i]
end

if #fields > 0 then
    redis.call('HSET', KEYS[1], unpack(fields))
end
return 1
"#;
