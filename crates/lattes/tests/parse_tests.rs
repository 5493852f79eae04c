use lattes::{parse, parse_with_config, ErrorKind, ParserConfig, ProductionCounts, Value};

const FIXTURE: &[u8] = include_bytes!("fixtures/curriculo.xml");

fn cv(value: &Value) -> Option<&Value> {
    value.pointer(&["curriculo-vitae"])
}

#[test]
fn test_fixture_summary() -> Result<(), Box<dyn std::error::Error>> {
    let (_, summary) = parse(FIXTURE)?;
    assert_eq!(summary.identifier, "4231401119207868");
    assert_eq!(summary.name, "João Conceição Araújo");
    assert_eq!(summary.last_update, "12/02/2024");
    assert_eq!(
        summary.counts,
        ProductionCounts {
            bibliographic: 6,
            technical: 1,
            other: 2,
        }
    );
    Ok(())
}

#[test]
fn test_fixture_general_data_allow_list() -> Result<(), Box<dyn std::error::Error>> {
    let (document, _) = parse(FIXTURE)?;
    let value = document.into_value();
    let general = cv(&value)
        .and_then(|cv| cv.pointer(&["dados-gerais"]))
        .and_then(Value::as_object)
        .ok_or("missing dados-gerais")?;

    let keys: Vec<&str> = general.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "nome-completo",
            "nome-em-citacoes-bibliograficas",
            "orcid-id",
            "formacao-academica-titulacao",
            "atuacoes-profissionais",
            "areas-de-atuacao",
        ]
    );
    for dropped in ["nacionalidade", "pais-de-nascimento", "resumo-cv", "endereco"] {
        assert!(!general.contains_key(dropped), "{dropped} should be filtered");
    }
    Ok(())
}

#[test]
fn test_fixture_keeps_other_sections_whole() -> Result<(), Box<dyn std::error::Error>> {
    let (document, _) = parse(FIXTURE)?;
    let value = document.into_value();
    let root = cv(&value).ok_or("missing root")?;

    let note = root.pointer(&[
        "dados-complementares",
        "informacoes-adicionais",
        lattes::TEXT_KEY,
    ]);
    assert_eq!(
        note.and_then(Value::as_string),
        Some("Texto livre sobre o pesquisador.")
    );

    let title = root
        .pointer(&[
            "producao-bibliografica",
            "artigos-publicados",
            "artigo-publicado",
        ])
        .and_then(Value::as_array)
        .and_then(|articles| articles.get(1))
        .and_then(|article| article.pointer(&["dados-basicos-do-artigo", "titulo-do-artigo"]))
        .and_then(Value::as_string);
    assert_eq!(title, Some("Polinização & dispersão"));
    Ok(())
}

#[test]
fn test_root_with_identifier_and_no_children() -> Result<(), Box<dyn std::error::Error>> {
    let (document, summary) = parse(b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"0001\"/>")?;
    assert_eq!(summary.identifier, "0001");
    assert_eq!(summary.name, "");
    assert_eq!(summary.last_update, "");
    assert_eq!(summary.counts, ProductionCounts::default());
    assert_eq!(document.root_key(), Some("curriculo-vitae"));
    Ok(())
}

#[test]
fn test_missing_identifier() {
    let err = parse(b"<CURRICULO-VITAE DATA-ATUALIZACAO=\"01012020\"></CURRICULO-VITAE>");
    assert!(matches!(
        err.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::MissingIdentifier { attribute }) if attribute == "NUMERO-IDENTIFICADOR"
    ));

    let empty = parse(b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"\"/>");
    assert!(matches!(
        empty.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::MissingIdentifier { .. })
    ));
}

#[test]
fn test_unexpected_root() {
    let err = parse(b"<?xml version=\"1.0\"?><html NUMERO-IDENTIFICADOR=\"1\"/>");
    assert!(matches!(
        err.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::UnexpectedRoot { found, .. }) if found == "html"
    ));
}

#[test]
fn test_root_is_checked_before_body() {
    // the body is broken too; the root mismatch is what gets reported
    let err = parse(b"<CV NUMERO-IDENTIFICADOR=\"1\"><a></b></CV>");
    assert!(matches!(
        err.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::UnexpectedRoot { .. })
    ));
}

#[test]
fn test_malformed_inputs() {
    let cases: [&[u8]; 6] = [
        b"",
        b"   \n  ",
        b"<?xml version=\"1.0\"?>",
        b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\"><DADOS-GERAIS>",
        b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\"><A></B></CURRICULO-VITAE>",
        b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\"><A B=\"open",
    ];
    for input in cases {
        let result = parse(input);
        assert!(
            matches!(result.as_ref().map_err(|e| e.kind()), Err(ErrorKind::MalformedInput)),
            "expected malformed input for {:?}",
            String::from_utf8_lossy(input)
        );
    }
}

#[test]
fn test_unterminated_attribute_reports_its_line() {
    let xml = b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\">\n<DADOS-GERAIS NOME-COMPLETO=\"Ana";
    let err = parse(xml);
    assert!(matches!(
        err.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::MalformedInput)
    ));
    assert_eq!(err.as_ref().map_err(|e| e.span().start.line), Err(2));
}

#[test]
fn test_content_after_root_is_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let xml = b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR='1'>\
        <PRODUCAO-TECNICA><SOFTWARE/></PRODUCAO-TECNICA>\
        </CURRICULO-VITAE>trailing <junk";
    let (document, summary) = parse(xml)?;

    assert_eq!(summary.identifier, "1");
    assert_eq!(
        summary.counts,
        ProductionCounts {
            bibliographic: 0,
            technical: 1,
            other: 0,
        }
    );
    assert_eq!(document.as_object().len(), 1);
    assert_eq!(document.root_key(), Some("curriculo-vitae"));
    Ok(())
}

#[test]
fn test_repeated_siblings_become_ordered_array() -> Result<(), Box<dyn std::error::Error>> {
    let xml = b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\">\
        <ITEM N=\"first\"/><OTHER/><ITEM N=\"second\"/></CURRICULO-VITAE>";
    let (document, _) = parse(xml)?;
    let value = document.into_value();

    let items = cv(&value)
        .and_then(|cv| cv.pointer(&["item"]))
        .and_then(Value::as_array)
        .ok_or("item should be an array")?;
    let order: Vec<_> = items
        .iter()
        .filter_map(|item| item.pointer(&["n"]))
        .filter_map(Value::as_string)
        .collect();
    assert_eq!(order, vec!["first", "second"]);

    let other = cv(&value).and_then(|cv| cv.pointer(&["other"]));
    assert!(other.is_some_and(Value::is_object));
    Ok(())
}

#[test]
fn test_attribute_element_collision_is_flagged() {
    let xml = b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"1\" DADOS=\"x\"><DADOS/></CURRICULO-VITAE>";
    let err = parse(xml);
    assert!(matches!(
        err.as_ref().map_err(|e| e.kind()),
        Err(ErrorKind::NameCollision { name }) if name == "dados"
    ));
}

#[test]
fn test_custom_allow_list() -> Result<(), Box<dyn std::error::Error>> {
    let config = ParserConfig::default().with_general_data_fields(["orcid-id"]);
    let (document, summary) = parse_with_config(FIXTURE, &config)?;
    let value = document.into_value();
    let general = cv(&value)
        .and_then(|cv| cv.pointer(&["dados-gerais"]))
        .and_then(Value::as_object)
        .ok_or("missing dados-gerais")?;

    assert_eq!(general.len(), 1);
    assert!(general.contains_key("orcid-id"));
    // the name is read after filtering
    assert_eq!(summary.name, "");
    Ok(())
}

#[test]
fn test_document_serializes_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let (document, summary) = parse(FIXTURE)?;
    let json = serde_json::to_string(&document)?;
    assert!(json.starts_with(r#"{"curriculo-vitae":{"sistema-origem-xml":"LATTES_OFFLINE""#));

    let back: lattes::Document = serde_json::from_str(&json)?;
    assert_eq!(back, document);
    let tree: Value = serde_json::from_str(&json)?;
    assert_eq!(tree, document.to_value());

    let summary_json = serde_json::to_value(&summary)?;
    assert_eq!(summary_json["counts"]["otherProduction"], 2);
    Ok(())
}
