//! Localized CLI strings.
//!
//! Every user-facing string in the binary goes through a `msg!` function so
//! help text and summaries follow the selected language. English is used when
//! nothing else is requested.

use std::sync::OnceLock;

static ACTIVE: OnceLock<Lang> = OnceLock::new();

/// Environment variables consulted for the language, in priority order.
const LANG_ENV_VARS: [&str; 3] = ["EMLPDF_LANG", "LC_MESSAGES", "LANG"];

/// Languages the CLI is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Es,
}

impl Lang {
    const ALL: [Lang; 2] = [Lang::En, Lang::Es];

    /// Match a locale or language tag (`es`, `es_ES.UTF-8`, `en-GB`) by its
    /// primary subtag.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['_', '-', '.']).next()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.code() == primary)
    }

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
        }
    }
}

/// Select the process-wide language. Only the first call has an effect.
pub fn set_lang(lang: Lang) {
    let _ = ACTIVE.set(lang);
}

/// The selected language, English until [`set_lang`] runs.
pub fn lang() -> Lang {
    ACTIVE.get().copied().unwrap_or(Lang::En)
}

/// Pick the language from the environment (see [`LANG_ENV_VARS`]).
pub fn detect_system_lang() -> Lang {
    LANG_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| Lang::from_code(&value))
        .unwrap_or(Lang::En)
}

/// Define a function returning the string for the active language.
macro_rules! msg {
    ($name:ident, $en:expr, $es:expr) => {
        #[doc = $en]
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Es => $es,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(
    app_about,
    "emlpdf \u{2014} Convert .eml email messages into paginated PDF documents.",
    "emlpdf \u{2014} Convierte mensajes de correo .eml en documentos PDF paginados."
);
msg!(
    app_long_about,
    "emlpdf \u{2014} Convert .eml email messages into paginated PDF documents.\nOne PDF per message, optionally sorted into year-month folders.\nExisting files are never overwritten.",
    "emlpdf \u{2014} Convierte mensajes de correo .eml en documentos PDF paginados.\nUn PDF por mensaje, opcionalmente ordenado en carpetas a\u{f1}o-mes.\nLos ficheros existentes nunca se sobrescriben."
);
msg!(
    app_after_help,
    "Examples:\n  emlpdf convert mail/*.eml -o out/\n  emlpdf convert inbox/ -o out/ --categorize --recursive\n  emlpdf inspect message.eml --json",
    "Ejemplos:\n  emlpdf convert correo/*.eml -o salida/\n  emlpdf convert bandeja/ -o salida/ --categorize --recursive\n  emlpdf inspect mensaje.eml --json"
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_verbose,
    "Verbose logging (-v info, -vv debug, -vvv trace)",
    "Registro detallado (-v info, -vv debug, -vvv trace)"
);
msg!(
    help_lang,
    "Language (en, es). Defaults to system locale",
    "Idioma (en, es). Por defecto usa el idioma del sistema"
);
msg!(
    help_cmd_convert,
    "Convert messages to PDF",
    "Convertir mensajes a PDF"
);
msg!(
    help_cmd_inspect,
    "Show the parsed fields of a message",
    "Mostrar los campos analizados de un mensaje"
);
msg!(
    help_cmd_config,
    "Show or initialize the configuration",
    "Mostrar o inicializar la configuraci\u{f3}n"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "Generar completions para tu shell"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "Generar p\u{e1}gina de manual"
);

// ── Convert output ───────────────────────────────────────────────

msg!(msg_converting, "Converting", "Convirtiendo");
msg!(msg_converted, "Converted", "Convertidos");
msg!(msg_failed, "Failed", "Fallidos");
msg!(msg_total, "Total", "Total");
msg!(msg_output_dir, "Output directory", "Directorio de salida");
msg!(msg_output_size, "Output size", "Tama\u{f1}o de salida");
msg!(msg_elapsed, "Time", "Tiempo");
msg!(
    msg_cancelled,
    "Conversion cancelled",
    "Conversi\u{f3}n cancelada"
);

// ── Inspect output ───────────────────────────────────────────────

msg!(msg_file, "File", "Fichero");
msg!(msg_file_size, "File size", "Tama\u{f1}o del fichero");
msg!(msg_subject, "Subject", "Asunto");
msg!(msg_from, "From", "De");
msg!(msg_to, "To", "Para");
msg!(msg_date, "Date", "Fecha");
msg!(msg_body_chars, "Body characters", "Caracteres del cuerpo");
msg!(msg_pages, "Pages", "P\u{e1}ginas");
msg!(
    msg_degraded,
    "Parsed with fallback",
    "Analizado con m\u{e9}todo alternativo"
);
msg!(msg_yes, "yes", "s\u{ed}");
msg!(msg_no, "no", "no");

// ── Config ───────────────────────────────────────────────────────

msg!(
    msg_config_file,
    "Configuration file",
    "Fichero de configuraci\u{f3}n"
);
msg!(
    msg_config_written,
    "Default configuration written to",
    "Configuraci\u{f3}n por defecto escrita en"
);

// ── Errors ───────────────────────────────────────────────────────

msg!(
    err_file_not_found,
    "File not found",
    "Fichero no encontrado"
);
msg!(
    err_no_eml_files,
    "No .eml files found in the given inputs",
    "No se encontraron ficheros .eml en las entradas indicadas"
);
msg!(
    err_no_output_dir,
    "No output directory given (use --output or output.default_dir in the config)",
    "No se indic\u{f3} directorio de salida (usa --output u output.default_dir en la configuraci\u{f3}n)"
);
msg!(
    err_config_exists,
    "Configuration file already exists",
    "El fichero de configuraci\u{f3}n ya existe"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_matches_primary_subtag() {
        assert_eq!(Lang::from_code("es"), Some(Lang::Es));
        assert_eq!(Lang::from_code("ES_es"), Some(Lang::Es));
        assert_eq!(Lang::from_code("en-GB"), Some(Lang::En));
        assert_eq!(Lang::from_code("es_ES.UTF-8"), Some(Lang::Es));
        assert_eq!(Lang::from_code("C.UTF-8"), None);
        assert_eq!(Lang::from_code("de"), None);
        assert_eq!(Lang::from_code(""), None);
    }

    #[test]
    fn test_codes_parse_back() {
        for lang in Lang::ALL {
            assert_eq!(Lang::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn test_convert_strings_are_translated() {
        // The active language is process-wide, so only check that both exist
        assert!(!msg_converting().is_empty());
        assert!(!err_no_output_dir().is_empty());
        assert_ne!(Lang::En.code(), Lang::Es.code());
    }
}
