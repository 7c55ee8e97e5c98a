//! CDT procedure code helpers.
//!
//! Procedure text is free-form ("D2740 crown #14, MOD"). These helpers pull
//! out the codes and answer the keyword questions the triage rules ask.

use std::sync::LazyLock;

use regex::Regex;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bD\d{4}\b").expect("valid CDT code pattern"));

static PROSTHETIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)implant|bridge|denture|partial").expect("valid prosthetic pattern")
});

static CLEANING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)prophy|cleaning|D1110|D1120").expect("valid cleaning pattern")
});

/// Upper-cased CDT codes in first-seen order, without duplicates.
pub fn extract_codes(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in CODE_RE.find_iter(text) {
        let code = m.as_str().to_ascii_uppercase();
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

/// Implant, bridge, denture or partial work. This one gate decides between
/// the missing-tooth block and the missing-tooth notice.
pub fn is_prosthetic(procedure: &str) -> bool {
    PROSTHETIC_RE.is_match(procedure)
}

pub fn is_cleaning(procedure: &str) -> bool {
    CLEANING_RE.is_match(procedure)
}

/// Reference data for a CDT code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdtEntry {
    pub code: &'static str,
    pub description: &'static str,
    /// Most common supporting ICD-10-CM diagnosis.
    pub icd10: &'static str,
}

const CDT_TABLE: &[CdtEntry] = &[
    CdtEntry { code: "D0120", description: "Periodic oral evaluation", icd10: "Z01.20" },
    CdtEntry { code: "D0150", description: "Comprehensive oral evaluation", icd10: "Z01.20" },
    CdtEntry { code: "D0210", description: "Intraoral complete series of radiographic images", icd10: "Z01.20" },
    CdtEntry { code: "D0274", description: "Bitewings, four radiographic images", icd10: "Z01.20" },
    CdtEntry { code: "D0330", description: "Panoramic radiographic image", icd10: "Z01.20" },
    CdtEntry { code: "D1110", description: "Prophylaxis, adult", icd10: "Z01.20" },
    CdtEntry { code: "D1120", description: "Prophylaxis, child", icd10: "Z01.20" },
    CdtEntry { code: "D1206", description: "Topical application of fluoride varnish", icd10: "Z29.3" },
    CdtEntry { code: "D1351", description: "Sealant, per tooth", icd10: "Z29.3" },
    CdtEntry { code: "D2150", description: "Amalgam, two surfaces, primary or permanent", icd10: "K02.52" },
    CdtEntry { code: "D2330", description: "Resin-based composite, one surface, anterior", icd10: "K02.52" },
    CdtEntry { code: "D2391", description: "Resin-based composite, one surface, posterior", icd10: "K02.52" },
    CdtEntry { code: "D2392", description: "Resin-based composite, two surfaces, posterior", icd10: "K02.52" },
    CdtEntry { code: "D2740", description: "Crown, porcelain/ceramic", icd10: "K02.53" },
    CdtEntry { code: "D2750", description: "Crown, porcelain fused to high noble metal", icd10: "K02.53" },
    CdtEntry { code: "D2950", description: "Core buildup, including any pins", icd10: "K02.53" },
    CdtEntry { code: "D3330", description: "Endodontic therapy, molar tooth", icd10: "K04.01" },
    CdtEntry { code: "D4341", description: "Periodontal scaling and root planing, four or more teeth per quadrant", icd10: "K05.311" },
    CdtEntry { code: "D4342", description: "Periodontal scaling and root planing, one to three teeth per quadrant", icd10: "K05.311" },
    CdtEntry { code: "D4910", description: "Periodontal maintenance", icd10: "K05.311" },
    CdtEntry { code: "D5110", description: "Complete denture, maxillary", icd10: "K08.109" },
    CdtEntry { code: "D5120", description: "Complete denture, mandibular", icd10: "K08.109" },
    CdtEntry { code: "D5211", description: "Maxillary partial denture, resin base", icd10: "K08.409" },
    CdtEntry { code: "D5212", description: "Mandibular partial denture, resin base", icd10: "K08.409" },
    CdtEntry { code: "D6010", description: "Surgical placement of implant body, endosteal implant", icd10: "K08.409" },
    CdtEntry { code: "D6056", description: "Prefabricated abutment", icd10: "K08.409" },
    CdtEntry { code: "D6057", description: "Custom fabricated abutment", icd10: "K08.409" },
    CdtEntry { code: "D6058", description: "Abutment supported porcelain/ceramic crown", icd10: "K08.409" },
    CdtEntry { code: "D6210", description: "Pontic, cast high noble metal", icd10: "K08.409" },
    CdtEntry { code: "D6240", description: "Pontic, porcelain fused to high noble metal", icd10: "K08.409" },
    CdtEntry { code: "D6245", description: "Pontic, porcelain/ceramic", icd10: "K08.409" },
    CdtEntry { code: "D6740", description: "Retainer crown, porcelain/ceramic", icd10: "K08.409" },
    CdtEntry { code: "D6750", description: "Retainer crown, porcelain fused to high noble metal", icd10: "K08.409" },
    CdtEntry { code: "D7140", description: "Extraction, erupted tooth or exposed root", icd10: "K08.89" },
    CdtEntry { code: "D7210", description: "Extraction, erupted tooth requiring removal of bone", icd10: "K08.89" },
    CdtEntry { code: "D7240", description: "Removal of impacted tooth, completely bony", icd10: "K01.1" },
    CdtEntry { code: "D8080", description: "Comprehensive orthodontic treatment, adolescent dentition", icd10: "M26.4" },
    CdtEntry { code: "D9110", description: "Palliative treatment of dental pain", icd10: "K08.89" },
];

/// Look up reference data for a code (case-insensitive).
pub fn lookup(code: &str) -> Option<&'static CdtEntry> {
    CDT_TABLE
        .iter()
        .find(|e| e.code.eq_ignore_ascii_case(code.trim()))
}
