use crate::models::IrpfStatusFlags;
use regex::Regex;

/// Classifies free-text IRPF status messages into outcome flags.
///
/// Three independent, order-insensitive matchers, each compiled once at
/// construction and reused across all rows. Classification is pure: the
/// same text always produces the same flags.
#[derive(Debug)]
pub struct StatusClassifier {
    extraction_error: Regex,
    not_declared: Regex,
    tax_refund: Regex,
}

impl StatusClassifier {
    pub fn new() -> Self {
        // Empty/whitespace-only text, a diverging birth date, "not
        // collected", or an inconsistency report: the extraction never
        // produced a usable status.
        let extraction_error = Regex::new(
            r"(?i)(?:^\s*$|\bdata\sde\snascimento\sinformada\b.*\bestá\sdive|\bnão\scoletado|\bocorreu\suma\sinconsistência\s?[.])",
        )
        .unwrap();

        // Filed as exempt, or not (yet) present in the tax-authority base.
        let not_declared = Regex::new(
            r"(?i)(?:\bconsta\sapresentação\sde\sdeclaração\sanual\sde\sisento\b|\bapresentação\sda\sdeclaração\scomo\sisento\b|\bdeclaração\sconsta\scomo\sisento\b|\bdeclaração\sconsta\scomo\spedido\sde\sregularização\b|\bsua\sdeclaração\snão\sconsta\sna\sbase\sde\sdados\b|\bainda\snão\sestá\sna\sbase\b)",
        )
        .unwrap();

        // Refund credited, scheduled, returned to the treasury, or an
        // already-processed declaration.
        let tax_refund = Regex::new(
            r"(?i)(?:\bsituação\sda\srestituição[:]\screditada\b|\bsomente\sserá\spermitida\spor\smeio\sdo\scódigo\sde\sacesso\b|\baguardando\sreagendamento\spelo\scontribuinte[.]?|\bdevolvida\sà\sreceita\sfederal[,]?\sem\srazão\sdo\snão\sresgate\b|\benviada\spara\scrédito\sno\sbanco\b|\breagendada\spara\scrédito\sno\sbanco\b|\bdados\sda\sliberação\sde\ssua\srestituição\b|\bdeclaração\sestá\sna\sbase\sde\sdados\b|\bestá\sna\sbase[,]\sutilize\so\sextrato\b|\bdeclaração\sjá\sfoi\sprocessada[.]?$|\brestituição[:]\saguardando\sdevolução\spelo\sbanco\b)",
        )
        .unwrap();

        StatusClassifier {
            extraction_error,
            not_declared,
            tax_refund,
        }
    }

    /// Derives the four status flags for one status message.
    ///
    /// Missing text never reaches the matchers: all three pattern flags
    /// stay 0 and the row falls through to `tax_to_pay`. An empty string,
    /// by contrast, is a positive extraction-error match.
    pub fn classify(&self, text: Option<&str>) -> IrpfStatusFlags {
        let extraction_error = text.map_or(0, |t| u8::from(self.extraction_error.is_match(t)));
        let not_declared = text.map_or(0, |t| u8::from(self.not_declared.is_match(t)));
        let tax_refund = text.map_or(0, |t| u8::from(self.tax_refund.is_match(t)));

        let tax_to_pay = u8::from(extraction_error == 0 && not_declared == 0 && tax_refund == 0);

        IrpfStatusFlags {
            extraction_error,
            not_declared,
            tax_refund,
            tax_to_pay,
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new()
    }
}
