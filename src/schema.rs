/// Canonical column names for qSIP metadata.
/// Single source of truth - exported to Python via PyO3.

// ── Source-level columns ────────────────────────────────────────────────────
pub mod source {
    pub const ISOTOPE: &str = "isotope";
    pub const ISOTOPOLOG: &str = "isotopolog";

    pub const ALL: [&str; 2] = [ISOTOPE, ISOTOPOLOG];
}

// ── Sample-level columns ────────────────────────────────────────────────────
pub mod sample {
    pub const SOURCE_MAT_ID: &str = "source_mat_id";
    pub const GRADIENT_POSITION: &str = "gradient_position";
    pub const GRADIENT_POS_DENSITY: &str = "gradient_pos_density";
    pub const GRADIENT_POS_AMT: &str = "gradient_pos_amt";

    pub const ALL: [&str; 4] = [
        SOURCE_MAT_ID,
        GRADIENT_POSITION,
        GRADIENT_POS_DENSITY,
        GRADIENT_POS_AMT,
    ];
}

// ── Row-key columns ─────────────────────────────────────────────────────────
pub mod index {
    /// Row key of a source table extracted from sample metadata.
    pub const ID: &str = "id";

    /// Id headers matched case-insensitively.
    pub const ID_HEADERS: [&str; 7] = [
        "id",
        "sampleid",
        "sample id",
        "sample-id",
        "featureid",
        "feature id",
        "feature-id",
    ];

    /// Id headers matched exactly.
    pub const ID_HEADERS_EXACT: [&str; 5] =
        ["#SampleID", "#Sample ID", "#OTUID", "#OTU ID", "sample_name"];

    pub fn is_id_header(name: &str) -> bool {
        ID_HEADERS_EXACT.contains(&name)
            || ID_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

// ── Metadata file directives ────────────────────────────────────────────────
pub mod directive {
    /// Leading character of comment rows and `#q2:` directive rows.
    pub const PREFIX: &str = "#";
}

/// Suffix of the caller-facing parameters that carry column aliases.
pub const COLUMN_PARAM_SUFFIX: &str = "_column";
