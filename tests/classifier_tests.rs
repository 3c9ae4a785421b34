/// Unit tests for tax-status classification
/// Tests the three Portuguese phrase matchers and the derived tax-to-pay flag
use irpf_presumed_income::classifier::StatusClassifier;

#[cfg(test)]
mod extraction_error_tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace_text() {
        let classifier = StatusClassifier::new();

        let flags = classifier.classify(Some(""));
        assert_eq!(flags.extraction_error, 1);
        assert_eq!(flags.not_declared, 0);
        assert_eq!(flags.tax_refund, 0);
        assert_eq!(flags.tax_to_pay, 0);

        assert_eq!(classifier.classify(Some("   ")).extraction_error, 1);
        assert_eq!(classifier.classify(Some("\t \t")).extraction_error, 1);
    }

    #[test]
    fn test_error_phrases() {
        let classifier = StatusClassifier::new();

        assert_eq!(
            classifier
                .classify(Some("a data de nascimento informada na consulta está divergente"))
                .extraction_error,
            1
        );
        assert_eq!(
            classifier.classify(Some("não coletado")).extraction_error,
            1
        );
        assert_eq!(
            classifier
                .classify(Some("ocorreu uma inconsistência."))
                .extraction_error,
            1
        );
    }

    #[test]
    fn test_case_insensitive_matching() {
        let classifier = StatusClassifier::new();
        assert_eq!(
            classifier.classify(Some("NÃO COLETADO")).extraction_error,
            1
        );
    }

    #[test]
    fn test_missing_text_is_not_an_error() {
        let classifier = StatusClassifier::new();

        // Missing text and empty text are different cases: only the
        // latter is a positive extraction-error match.
        let flags = classifier.classify(None);
        assert_eq!(flags.extraction_error, 0);
        assert_eq!(flags.not_declared, 0);
        assert_eq!(flags.tax_refund, 0);
        assert_eq!(flags.tax_to_pay, 1);
    }
}

#[cfg(test)]
mod not_declared_tests {
    use super::*;

    #[test]
    fn test_exempt_declaration_phrases() {
        let classifier = StatusClassifier::new();

        let samples = [
            "consta apresentação de declaração anual de isento",
            "apresentação da declaração como isento",
            "declaração consta como isento",
            "declaração consta como pedido de regularização",
        ];
        for text in samples {
            let flags = classifier.classify(Some(text));
            assert_eq!(flags.not_declared, 1, "expected not_declared for: {}", text);
            assert_eq!(flags.tax_to_pay, 0);
        }
    }

    #[test]
    fn test_not_in_database_phrases() {
        let classifier = StatusClassifier::new();

        assert_eq!(
            classifier
                .classify(Some("sua declaração não consta na base de dados"))
                .not_declared,
            1
        );
        assert_eq!(
            classifier
                .classify(Some("ainda não está na base"))
                .not_declared,
            1
        );
    }
}

#[cfg(test)]
mod tax_refund_tests {
    use super::*;

    #[test]
    fn test_refund_credited_and_scheduled() {
        let classifier = StatusClassifier::new();

        let samples = [
            "situação da restituição: creditada",
            "aguardando reagendamento pelo contribuinte.",
            "enviada para crédito no banco",
            "reagendada para crédito no banco",
            "dados da liberação de sua restituição",
            "restituição: aguardando devolução pelo banco",
        ];
        for text in samples {
            let flags = classifier.classify(Some(text));
            assert_eq!(flags.tax_refund, 1, "expected tax_refund for: {}", text);
            assert_eq!(flags.tax_to_pay, 0);
        }
    }

    #[test]
    fn test_refund_returned_to_treasury() {
        let classifier = StatusClassifier::new();
        assert_eq!(
            classifier
                .classify(Some(
                    "devolvida à receita federal, em razão do não resgate"
                ))
                .tax_refund,
            1
        );
    }

    #[test]
    fn test_processed_declaration_is_terminal_phrase() {
        let classifier = StatusClassifier::new();

        // Anchored at the end of the message.
        assert_eq!(
            classifier
                .classify(Some("sua declaração já foi processada."))
                .tax_refund,
            1
        );
        assert_eq!(
            classifier
                .classify(Some("declaração já foi processada"))
                .tax_refund,
            1
        );
    }
}

#[cfg(test)]
mod tax_to_pay_tests {
    use super::*;

    #[test]
    fn test_unmatched_text_means_tax_to_pay() {
        let classifier = StatusClassifier::new();

        let flags = classifier.classify(Some("imposto a pagar apurado na declaração"));
        assert_eq!(flags.extraction_error, 0);
        assert_eq!(flags.not_declared, 0);
        assert_eq!(flags.tax_refund, 0);
        assert_eq!(flags.tax_to_pay, 1);
    }

    #[test]
    fn test_tax_to_pay_is_nor_of_other_flags() {
        let classifier = StatusClassifier::new();

        let samples = [
            Some(""),
            Some("não coletado"),
            Some("declaração consta como isento"),
            Some("reagendada para crédito no banco"),
            Some("saldo de imposto a pagar"),
            None,
        ];
        for text in samples {
            let flags = classifier.classify(text);
            let any_other =
                flags.extraction_error == 1 || flags.not_declared == 1 || flags.tax_refund == 1;
            assert_eq!(
                flags.tax_to_pay == 1,
                !any_other,
                "NOR violated for {:?}",
                text
            );
        }
    }
}
