//! PAC artifact emission.
//!
//! Serializes the per-level bucket tables and the selected balancing logic
//! into a self-contained `FindProxyForURL` function. Bucket entries store
//! the fragment base right-shifted by `32 - prefix`; the level's prefix is
//! implicit in the table the entry sits in, so entries are plain numbers
//! and the tables stay compact.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::addr;
use crate::balance::BalanceMode;
use crate::bucket::LookupTable;
use crate::range::NetworkRange;

/// JS helpers shared by every generated artifact. `hash_masked_ip` rebuilds
/// the positional value by repeated doubling; a JS `<<` would truncate it to
/// a signed 32-bit intermediate.
const JS_HELPERS: &str = r#"
  var dot2num = function(dot) {
    var d = dot.split(".");
    return ((((((+d[0]) * 256) + (+d[1])) * 256) + (+d[2])) * 256) + (+d[3]);
  };

  var num2dot = function(ip) {
    return [ip >>> 24, ip >>> 16 & 0xFF, ip >>> 8 & 0xFF, ip & 0xFF].join(".");
  };

  var hash_masked_ip = function(ip, mask_len, mod_base) {
    var offset = 32 - mask_len;
    var net = ip >>> offset;
    for (var i = 0; i < offset; i++) {
      net *= 2;
    }
    return net % mod_base;
  };

  var prefixlen2mask = function(prefixlen) {
    var imask = prefixlen == 0 ? 0 : 0xFFFFFFFF << (32 - prefixlen);
    return (imask >> 24 & 0xFF) + '.' + (imask >> 16 & 0xFF) + '.' + (imask >> 8 & 0xFF) + '.' + (imask & 0xFF);
  };

  var rebuild_net = function(packed, prefixlen) {
    return [num2dot(packed << (32 - prefixlen)), prefixlen2mask(prefixlen)];
  };

  var lookup_ip = function(ip) {
    var n_ip = dot2num(ip);
    for (var li = 0; li < hashed_levels.length; li++) {
      var len = hashed_levels[li][0];
      var buckets = hashed_levels[li][1];
      var bucket = buckets[hash_masked_ip(n_ip, len, HASH_BASE)];
      for (var i = 0; i < bucket.length; i++) {
        var n = rebuild_net(bucket[i], len);
        if (isInNet(ip, n[0], n[1])) {
          return true;
        }
      }
    }
    return false;
  };
"#;

/// Render the complete PAC artifact. Identical inputs and configuration
/// produce byte-identical output.
pub fn render(
    table: &LookupTable,
    proxies: &[String],
    balance: BalanceMode,
    no_proxy: &[String],
    mask_step: u8,
) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!(
        "// Generated by pacforge v{}\n// Regenerated from delegation data; do not edit by hand.\n\nfunction FindProxyForURL(url, host) {{\n",
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(JS_HELPERS);

    let min_prefixlen = table.levels.first().map(|l| l.prefix).unwrap_or(0);
    let max_prefixlen = table.levels.last().map(|l| l.prefix).unwrap_or(0);
    out.push_str(&format!(
        "\n  var HASH_BASE = {};\n  var MASK_STEP = {};\n  var min_prefixlen = {};\n  var max_prefixlen = {};\n",
        table.hash_base, mask_step, min_prefixlen, max_prefixlen
    ));

    out.push_str("\n  var hashed_levels = [\n");
    for level in &table.levels {
        let packed: Vec<Vec<u32>> = level
            .buckets
            .iter()
            .map(|bucket| bucket.iter().map(|f| pack_fragment(f)).collect())
            .collect();
        let literal = serde_json::to_string(&packed)
            .wrap_err("Failed to serialize bucket table")?;
        out.push_str(&format!("    [{}, {}],\n", level.prefix, literal));
    }
    out.push_str("  ];\n");

    out.push_str(
        "\n  if (isPlainHostName(host)\n   || (host == '127.0.0.1')\n   || (host == 'localhost')\n   ) {\n    return 'DIRECT';\n  }\n\n  var ip = dnsResolve(host);\n\n",
    );
    out.push_str(&format!(
        "  if (ip == null || ip == '' ||{} lookup_ip(ip)) {{\n    return 'DIRECT';\n  }}\n",
        no_proxy_clauses(no_proxy)
    ));

    out.push_str(&balancer_js(proxies, balance));
    out.push_str("}\n");
    Ok(out)
}

/// Bucket entry for a fragment: the base shifted down to its significant
/// bits. The level's prefix reverses the shift at evaluation time.
fn pack_fragment(fragment: &NetworkRange) -> u32 {
    if fragment.prefix() == 0 {
        0
    } else {
        fragment.base() >> (32 - u32::from(fragment.prefix()))
    }
}

/// Bypass conditions, one ` ... ||` clause per entry: literal addresses
/// compare against the resolved address, CIDR entries use isInNet, anything
/// else compares against the hostname.
fn no_proxy_clauses(no_proxy: &[String]) -> String {
    let mut clauses = String::new();
    for entry in no_proxy {
        if addr::parse_addr(entry).is_ok() {
            clauses.push_str(&format!(" ip == '{}' ||", entry));
        } else if let Ok(range) = entry.parse::<NetworkRange>() {
            clauses.push_str(&format!(
                " isInNet(ip, '{}', '{}') ||",
                addr::format_addr(range.base()),
                addr::format_addr(addr::mask_for_prefix(range.prefix()))
            ));
        } else {
            clauses.push_str(&format!(" host == '{}' ||", entry));
        }
    }
    clauses
}

/// The selected balancing policy as embedded JS. Rotations join the proxy
/// descriptors with `;` into a single PAC directive string.
fn balancer_js(proxies: &[String], balance: BalanceMode) -> String {
    let quoted = proxies
        .iter()
        .map(|p| format!("'{}'", p))
        .collect::<Vec<_>>()
        .join(", ");

    match balance {
        BalanceMode::No => format!("\n  return '{}';\n", proxies.join("; ")),
        BalanceMode::LocalIp => format!(
            r#"
  var local_ip_balance = function(proxies) {{
    var myseg = parseInt(myIpAddress().split(".")[3]);
    var k = myseg % proxies.length;
    var ordered = [];
    for (var i = 0; i < proxies.length; i++) {{
      ordered.push(proxies[(k + i) % proxies.length]);
    }}
    return ordered.join("; ");
  }};

  return local_ip_balance([{quoted}]);
"#
        ),
        BalanceMode::Host => format!(
            r#"
  var hash_string = function(s) {{
    var hash = 0;
    for (var i = 0; i < s.length; i++) {{
      hash = (hash << 5) - hash + s.charCodeAt(i);
      hash &= 0xFFFF;
    }}
    return hash;
  }};

  var target_host_balance = function(proxies, host) {{
    var k = hash_string(host) % proxies.length;
    var ordered = [];
    for (var i = 0; i < proxies.length; i++) {{
      ordered.push(proxies[(k + i) % proxies.length]);
    }}
    return ordered.join("; ");
  }};

  return target_host_balance([{quoted}], host);
"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::LookupTable;
    use crate::fragment;
    use crate::range::{merge, NetworkRange};

    fn proxies() -> Vec<String> {
        vec![
            "SOCKS5 127.0.0.1:1984".to_string(),
            "SOCKS5 127.0.0.1:1989".to_string(),
        ]
    }

    fn sample_table() -> LookupTable {
        let merged = merge(&["10.0.0.0/8".parse::<NetworkRange>().unwrap()]);
        let levels = fragment::levels(10, 24, 2);
        LookupTable::build(&fragment::fragment_all(&merged, &levels), 7)
    }

    #[test]
    fn test_render_embeds_structure() {
        let content = render(&sample_table(), &proxies(), BalanceMode::No, &[], 2).unwrap();
        assert!(content.contains("function FindProxyForURL(url, host)"));
        assert!(content.contains("var HASH_BASE = 7;"));
        assert!(content.contains("var MASK_STEP = 2;"));
        assert!(content.contains("var min_prefixlen = 10;"));
        assert!(content.contains("var max_prefixlen = 24;"));
        assert!(content.contains("var hashed_levels = ["));
        assert!(content.contains("lookup_ip = function(ip)"));
        assert!(content.contains("return 'DIRECT';"));
    }

    #[test]
    fn test_render_packs_level10_fragments() {
        // 10.0.0.0/8 fragments to four level-10 entries; packed value of
        // 10.0.0.0/10 is 0x0A000000 >> 22
        let content = render(&sample_table(), &proxies(), BalanceMode::No, &[], 2).unwrap();
        let packed = 0x0A00_0000u32 >> 22;
        assert!(content.contains(&format!("{}", packed)));
    }

    #[test]
    fn test_render_no_balance_joins_proxies() {
        let content = render(&sample_table(), &proxies(), BalanceMode::No, &[], 2).unwrap();
        assert!(content.contains("return 'SOCKS5 127.0.0.1:1984; SOCKS5 127.0.0.1:1989';"));
    }

    #[test]
    fn test_render_local_ip_balancer() {
        let content =
            render(&sample_table(), &proxies(), BalanceMode::LocalIp, &[], 2).unwrap();
        assert!(content.contains("var local_ip_balance = function(proxies)"));
        assert!(content.contains("return local_ip_balance(["));
        assert!(content.contains("'SOCKS5 127.0.0.1:1984', 'SOCKS5 127.0.0.1:1989'"));
    }

    #[test]
    fn test_render_host_balancer() {
        let content = render(&sample_table(), &proxies(), BalanceMode::Host, &[], 2).unwrap();
        assert!(content.contains("var hash_string = function(s)"));
        assert!(content.contains("var target_host_balance = function(proxies, host)"));
        assert!(content.contains("hash_string(host) % proxies.length"));
        assert!(content.contains("return target_host_balance(["));
    }

    #[test]
    fn test_no_proxy_clauses() {
        let entries = vec![
            "192.168.1.1".to_string(),
            "192.168.0.0/24".to_string(),
            "intranet.example.com".to_string(),
        ];
        let clauses = no_proxy_clauses(&entries);
        assert!(clauses.contains("ip == '192.168.1.1' ||"));
        assert!(clauses.contains("isInNet(ip, '192.168.0.0', '255.255.255.0') ||"));
        assert!(clauses.contains("host == 'intranet.example.com' ||"));
    }

    #[test]
    fn test_render_deterministic() {
        let a = render(&sample_table(), &proxies(), BalanceMode::Host, &[], 2).unwrap();
        let b = render(&sample_table(), &proxies(), BalanceMode::Host, &[], 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pack_fragment() {
        let fragment: NetworkRange = "10.0.0.0/10".parse().unwrap();
        assert_eq!(pack_fragment(&fragment), 0x0A00_0000 >> 22);
        let whole: NetworkRange = "0.0.0.0/0".parse().unwrap();
        assert_eq!(pack_fragment(&whole), 0);
    }
}
