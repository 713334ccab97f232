use std::collections::HashMap;
use std::sync::LazyLock;

/// Reduce a header to its comparison form: ASCII letters and digits only,
/// upper-cased. "Well Name:" and "WELL_NAME" both become "WELLNAME".
pub fn compact(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Canonical columns a compacted header may stand for, most likely first.
///
/// Several tables share short headers ("DEPTH", "TOP"), so an alias lists
/// candidates and the mapper takes the first one the target schema has.
pub fn candidates(compacted: &str) -> Option<&'static [&'static str]> {
    ALIASES.get(compacted).copied()
}

static ALIASES: LazyLock<HashMap<&'static str, &'static [&'static str]>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();

    // Well identifier
    m.insert("UWI", &["UWI"]);
    m.insert("WELLID", &["UWI"]);
    m.insert("WELLIDENTIFIER", &["UWI"]);
    m.insert("UNIQUEWELLIDENTIFIER", &["UWI"]);
    m.insert("API", &["UWI"]);
    m.insert("APINO", &["UWI"]);
    m.insert("APINUMBER", &["UWI"]);
    m.insert("WELLNO", &["UWI"]);
    m.insert("WELLNUMBER", &["UWI"]);

    // Well header
    m.insert("WELL", &["WELL_NAME"]);
    m.insert("WELLNM", &["WELL_NAME"]);
    m.insert("NAME", &["WELL_NAME"]);
    m.insert("FIELDNAME", &["FIELD"]);
    m.insert("OPERATORNAME", &["OPERATOR"]);
    m.insert("COMPANY", &["OPERATOR"]);
    m.insert("SPUD", &["SPUD_DATE"]);
    m.insert("SPUDDED", &["SPUD_DATE"]);
    m.insert("DATESPUDDED", &["SPUD_DATE"]);
    m.insert("COMPLETED", &["COMPLETION_DATE"]);
    m.insert("COMPLETIONDT", &["COMPLETION_DATE"]);
    m.insert("DATECOMPLETED", &["COMPLETION_DATE"]);
    m.insert("KB", &["KB_ELEVATION"]);
    m.insert("KBELEV", &["KB_ELEVATION"]);
    m.insert("KELLYBUSHING", &["KB_ELEVATION"]);
    m.insert("TD", &["TOTAL_DEPTH"]);
    m.insert("DRILLERSTD", &["TOTAL_DEPTH"]);
    m.insert("LAT", &["LATITUDE"]);
    m.insert("LONG", &["LONGITUDE"]);
    m.insert("LON", &["LONGITUDE"]);

    // Casing
    m.insert("TYPE", &["CASING_TYPE", "LOG_TYPE", "SHOW_TYPE"]);
    m.insert("CASING", &["CASING_TYPE"]);
    m.insert("STRING", &["CASING_TYPE"]);
    m.insert("SIZE", &["CASING_SIZE"]);
    m.insert("OD", &["CASING_SIZE"]);
    m.insert("WT", &["WEIGHT"]);
    m.insert("WEIGHTLBFT", &["WEIGHT"]);
    m.insert("CEMENT", &["CEMENT_VOLUME"]);
    m.insert("CEMENTVOL", &["CEMENT_VOLUME"]);

    // Shared depth headers
    m.insert("TOP", &["TOP_DEPTH"]);
    m.insert("FROM", &["TOP_DEPTH"]);
    m.insert("BOTTOM", &["BOTTOM_DEPTH"]);
    m.insert("BASE", &["BOTTOM_DEPTH"]);
    m.insert("TO", &["BOTTOM_DEPTH"]);
    m.insert("SETTINGDEPTH", &["BOTTOM_DEPTH"]);
    m.insert("SHOEDEPTH", &["BOTTOM_DEPTH"]);
    m.insert(
        "DEPTH",
        &["MEASURED_DEPTH", "SAMPLE_DEPTH", "TOP_DEPTH", "BOTTOM_DEPTH"],
    );

    // Logs
    m.insert("LOG", &["LOG_TYPE"]);
    m.insert("RUN", &["RUN_NUMBER"]);
    m.insert("RUNNO", &["RUN_NUMBER"]);
    m.insert("DATE", &["LOGGING_DATE"]);
    m.insert("LOGGEDBY", &["CONTRACTOR"]);
    m.insert("SERVICECOMPANY", &["CONTRACTOR"]);

    // Directional survey
    m.insert("MD", &["MEASURED_DEPTH"]);
    m.insert("INC", &["INCLINATION"]);
    m.insert("INCL", &["INCLINATION"]);
    m.insert("ANGLE", &["INCLINATION"]);
    m.insert("AZI", &["AZIMUTH"]);
    m.insert("AZ", &["AZIMUTH"]);
    m.insert("TRUEVERTICALDEPTH", &["TVD"]);
    m.insert("NS", &["NORTHING"]);
    m.insert("NORTH", &["NORTHING"]);
    m.insert("EW", &["EASTING"]);
    m.insert("EAST", &["EASTING"]);

    // Sidewall cores and shows
    m.insert("LITH", &["LITHOLOGY"]);
    m.insert("ROCKTYPE", &["LITHOLOGY"]);
    m.insert("REC", &["RECOVERY"]);
    m.insert("RECOVERED", &["RECOVERY"]);
    m.insert("DESC", &["DESCRIPTION"]);
    m.insert("REMARKS", &["DESCRIPTION"]);
    m.insert("FORMATIONNAME", &["FORMATION"]);
    m.insert("FM", &["FORMATION"]);
    m.insert("SHOW", &["SHOW_TYPE"]);
    m.insert("GAS", &["GAS_READING"]);
    m.insert("TOTALGAS", &["GAS_READING"]);

    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact() {
        assert_eq!(compact(" Well Name: "), "WELLNAME");
        assert_eq!(compact("kb_elevation"), "KBELEVATION");
        assert_eq!(compact("API No."), "APINO");
    }

    #[test]
    fn test_candidates() {
        assert_eq!(candidates("MD"), Some(&["MEASURED_DEPTH"][..]));
        assert_eq!(candidates("APINO"), Some(&["UWI"][..]));
        assert!(candidates("DEPTH").unwrap().contains(&"SAMPLE_DEPTH"));
        assert_eq!(candidates("NOSUCHHEADER"), None);
    }
}
