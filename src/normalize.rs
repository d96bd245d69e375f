const LITERAL_REPLACEMENTS: &[(&str, &str)] = &[
    ("ATENCIï¿½N", "ATENCION"),
    ("APLICACIï¿½N", "APLICACION"),
    ("FLï¿½OR", "FLUOR"),
    ("Aï¿½OS", "AÑOS"),
    ("Aï¿½O", "AÑO"),
    ("NIï¿½OS", "NIÑOS"),
    ("NIï¿½O", "NIÑO"),
    ("ODONTOLOGï¿½A", "ODONTOLOGIA"),
    ("Mï¿½DICO", "MEDICO"),
    ("ENFERMERï¿½A", "ENFERMERIA"),
    ("BIOLï¿½GICO", "BIOLOGICO"),
    ("QUï¿½MICO", "QUIMICO"),
    ("Fï¿½SICO", "FISICO"),
    ("CLï¿½NICO", "CLINICO"),
    ("Bï¿½SICO", "BASICO"),
    ("EVALUACIï¿½N", "EVALUACION"),
    ("VACUNACIï¿½N", "VACUNACION"),
    ("NUTRICIï¿½N", "NUTRICION"),
    ("PREVENCIï¿½N", "PREVENCION"),
    ("PROMOCIï¿½N", "PROMOCION"),
    ("GESTACIï¿½N", "GESTACION"),
    ("ORIENTACIï¿½N", "ORIENTACION"),
];

pub fn normalize_text(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut text = value.to_string();
    for (bad, good) in LITERAL_REPLACEMENTS {
        if text.contains(bad) {
            text = text.replace(bad, good);
        }
    }

    // Remaining mojibake is almost always an accented O; a bare replacement
    // character is usually an eaten ñ.
    text = text.replace("ï¿½", "O");
    text = text.replace('\u{FFFD}', "n");

    text
}
