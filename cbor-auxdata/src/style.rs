use semver::Version;

/// Governs how CBOR-metadata auxdata is located in a given bytecode and how
/// many auxdata regions are expected to be present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuxdataStyle {
    /// `solc` emits `cborAuxdata` positions directly in standard-json output
    /// (>=0.8.x), or positions are recovered via the mutation-diff technique
    /// for older versions.
    SolidityStandard,
    /// No CBOR auxdata is appended at all.
    VyperPre0_3_5,
    /// A single trailing CBOR blob with no explicit length prefix.
    Vyper0_3_5To0_3_9,
    /// A trailing CBOR blob followed by a 2-byte big-endian length prefix.
    Vyper0_3_10OrNewer,
    /// Same trailing encoding as `Vyper0_3_10OrNewer`, but immutables are
    /// appended to the runtime bytecode *after* the auxdata region.
    Vyper0_4_1OrNewer,
    /// The compiler does not embed auxdata (e.g. Yul, or unknown language).
    None,
}

impl AuxdataStyle {
    /// Picks the auxdata style for a Vyper compiler version, per the
    /// boundaries fixed by the Vyper compiler's own metadata encoding
    /// history.
    pub fn for_vyper(version: &Version) -> Self {
        let v0_3_5 = Version::new(0, 3, 5);
        let v0_3_10 = Version::new(0, 3, 10);
        let v0_4_1 = Version::new(0, 4, 1);

        if *version < v0_3_5 {
            AuxdataStyle::VyperPre0_3_5
        } else if *version < v0_3_10 {
            AuxdataStyle::Vyper0_3_5To0_3_9
        } else if *version < v0_4_1 {
            AuxdataStyle::Vyper0_3_10OrNewer
        } else {
            AuxdataStyle::Vyper0_4_1OrNewer
        }
    }

    pub fn for_solidity() -> Self {
        AuxdataStyle::SolidityStandard
    }

    pub fn has_trailing_length_prefix(&self) -> bool {
        matches!(
            self,
            AuxdataStyle::Vyper0_3_10OrNewer | AuxdataStyle::Vyper0_4_1OrNewer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vyper_style_boundaries() {
        let cases = [
            ("0.3.4", AuxdataStyle::VyperPre0_3_5),
            ("0.3.5", AuxdataStyle::Vyper0_3_5To0_3_9),
            ("0.3.9", AuxdataStyle::Vyper0_3_5To0_3_9),
            ("0.3.10", AuxdataStyle::Vyper0_3_10OrNewer),
            ("0.4.0", AuxdataStyle::Vyper0_3_10OrNewer),
            ("0.4.1", AuxdataStyle::Vyper0_4_1OrNewer),
            ("0.5.0", AuxdataStyle::Vyper0_4_1OrNewer),
        ];
        for (version, expected) in cases {
            let version = Version::parse(version).unwrap();
            assert_eq!(AuxdataStyle::for_vyper(&version), expected, "{version}");
        }
    }
}
