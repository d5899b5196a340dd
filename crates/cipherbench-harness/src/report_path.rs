//! Canonical report-path derivation and directory-name sanitization.

use cipherbench_abi::{BenchmarkDescriptor, MAX_OP_PARAMS, WorkloadParam};

/// Separator replacing `/` when a single-level report path is requested.
pub const SINGLE_PATH_SEPARATOR: char = '-';

/// Converts a string into a directory-name-friendly form: lowercase,
/// every run of non-alphanumeric-non-dot characters collapsed into a
/// single underscore, no leading or trailing underscore.
#[must_use]
pub fn to_dir_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Cipher-mask path component: `all_plain` for an empty mask, `all_cipher`
/// when every operand bit is set, otherwise a `c`/`p` string of length
/// max-set-bit + 1.
#[must_use]
pub fn cipher_mask_string(mask: u32) -> String {
    if mask == 0 {
        return String::from("all_plain");
    }
    if mask == u32::MAX {
        return String::from("all_cipher");
    }
    let top = MAX_OP_PARAMS - mask.leading_zeros() as usize;
    (0..top)
        .map(|i| if mask & (1 << i) != 0 { 'c' } else { 'p' })
        .collect()
}

/// Components of the canonical report path, in order.
fn path_components(
    descriptor: &BenchmarkDescriptor,
    w_params: &[WorkloadParam],
    workload_name: &str,
    scheme_name: &str,
    security_name: &str,
) -> Vec<String> {
    let mut components = Vec::with_capacity(9);

    let mut workload = String::new();
    if !workload_name.is_empty() {
        workload.push_str(workload_name);
        workload.push('_');
    }
    workload.push_str(&descriptor.workload.id().to_string());
    components.push(to_dir_name(&workload));

    let mut wp = String::from("wp");
    for param in w_params {
        wp.push('_');
        wp.push_str(&param.value_text());
    }
    components.push(to_dir_name(&wp));

    components.push(to_dir_name(descriptor.category.name()));
    components.push(to_dir_name(descriptor.data_type.name()));

    let mut timing = format!("{}ms", descriptor.cat_params.min_test_time_ms);
    let reserved = &descriptor.cat_params.reserved;
    let mut non_zero = reserved.len();
    while non_zero > 0 && reserved[non_zero - 1] == 0 {
        non_zero -= 1;
    }
    if non_zero == 0 {
        timing.push_str("_default");
    } else {
        for r in &reserved[..non_zero] {
            timing.push_str(&format!("_{r}"));
        }
    }
    components.push(timing);

    components.push(cipher_mask_string(descriptor.cipher_param_mask));
    components.push(to_dir_name(scheme_name));
    components.push(to_dir_name(security_name));
    components.push(descriptor.other.to_string());

    components
}

/// Deterministic relative report path for a concrete descriptor.
///
/// With `single_path` the components are joined into one directory level
/// with hyphens instead of path separators.
#[must_use]
pub fn derive_report_path(
    descriptor: &BenchmarkDescriptor,
    w_params: &[WorkloadParam],
    workload_name: &str,
    scheme_name: &str,
    security_name: &str,
    single_path: bool,
) -> String {
    let components = path_components(descriptor, w_params, workload_name, scheme_name, security_name);
    let separator = if single_path {
        SINGLE_PATH_SEPARATOR.to_string()
    } else {
        String::from("/")
    };
    components.join(&separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherbench_abi::{Category, CategoryParams, DataType, Workload};

    #[test]
    fn dir_names_are_sanitized() {
        assert_eq!(to_dir_name("Hello, World!"), "hello_world");
        assert_eq!(to_dir_name("  __128 bit__ "), "128_bit");
        assert_eq!(to_dir_name("v1.2-beta"), "v1.2_beta");
        assert_eq!(to_dir_name("CKKS"), "ckks");
    }

    #[test]
    fn sanitized_names_have_no_consecutive_or_edge_underscores() {
        for input in ["a!!b", "!!a", "a!!", "a - b -- c", "(x)(y)"] {
            let name = to_dir_name(input);
            assert!(!name.contains("__"), "{input} -> {name}");
            assert!(!name.starts_with('_'), "{input} -> {name}");
            assert!(!name.ends_with('_'), "{input} -> {name}");
            assert!(
                name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_'),
                "{input} -> {name}"
            );
        }
    }

    #[test]
    fn cipher_mask_strings() {
        assert_eq!(cipher_mask_string(0), "all_plain");
        assert_eq!(cipher_mask_string(u32::MAX), "all_cipher");
        assert_eq!(cipher_mask_string(0b10), "pc");
        assert_eq!(cipher_mask_string(0b01), "c");
        assert_eq!(cipher_mask_string(0b101), "cpc");
    }

    #[test]
    fn path_matches_canonical_layout() {
        let descriptor = BenchmarkDescriptor {
            workload: Workload::EltwiseAdd,
            data_type: DataType::Float64,
            category: Category::Latency,
            cat_params: CategoryParams::latency(2_000, 2),
            cipher_param_mask: 0b10,
            scheme: 0,
            security: 0,
            other: 0,
        };
        let w_params = vec![WorkloadParam::uint("n", 1_000)];
        let path = derive_report_path(
            &descriptor,
            &w_params,
            "Element-wise Addition",
            "CKKS",
            "128 bit",
            false,
        );
        assert_eq!(
            path,
            "element_wise_addition_0/wp_1000/latency/float64/2000ms_default/pc/ckks/128_bit/0"
        );

        let single = derive_report_path(
            &descriptor,
            &w_params,
            "Element-wise Addition",
            "CKKS",
            "128 bit",
            true,
        );
        assert_eq!(
            single,
            "element_wise_addition_0-wp_1000-latency-float64-2000ms_default-pc-ckks-128_bit-0"
        );
    }

    #[test]
    fn reserved_slots_extend_the_timing_component() {
        let mut descriptor = BenchmarkDescriptor {
            workload: Workload::DotProduct,
            data_type: DataType::Float32,
            category: Category::Offline,
            cat_params: CategoryParams::offline(0, vec![3, 10]),
            cipher_param_mask: 0,
            scheme: 0,
            security: 0,
            other: 1,
        };
        descriptor.cat_params.reserved[0] = 7;
        descriptor.cat_params.reserved[1] = 9;
        let path = derive_report_path(&descriptor, &[], "Dot Product", "BFV", "192 bit", false);
        assert!(path.contains("/0ms_7_9/"), "path: {path}");
        assert!(path.ends_with("/all_plain/bfv/192_bit/1"), "path: {path}");
    }
}
