use infrastructure::parser::ScaleParser;

#[test] // parses_simple_numeric_weight
fn parses_simple_numeric_weight() {
    let parser = ScaleParser::new();
    let result = parser.parse("   5.00kg").expect("Should parse successfully");
    assert_eq!(result.value, 5.00);
    assert_eq!(result.unit, "kg");
    assert!(result.stable);
}

#[test] // parses_negative_weight
fn parses_negative_weight() {
    let parser = ScaleParser::new();
    let result = parser.parse("-12.45 kg").expect("Should parse successfully");
    assert_eq!(result.value, -12.45);
    assert_eq!(result.unit, "kg");
}

#[test] // parses_weight_with_spaces_in_unit
fn parses_weight_with_spaces_in_unit() {
    let parser = ScaleParser::new();
    let result = parser.parse("   0.532   g").expect("Should parse successfully");
    assert_eq!(result.value, 0.532);
    assert_eq!(result.unit, "g");
}

#[test] // parses_sign_separated_from_digits
fn parses_sign_separated_from_digits() {
    let parser = ScaleParser::new();
    let result = parser.parse(" -  5.00kg").expect("Should parse successfully");
    assert_eq!(result.value, -5.00);
    assert_eq!(result.unit, "kg");
}

#[test] // parses_rs232_prefixed_message
fn parses_rs232_prefixed_message() {
    let parser = ScaleParser::new();
    let result = parser.parse("ST,GS,  5.00kg").expect("Should parse successfully");
    assert_eq!(result.value, 5.00);
    assert_eq!(result.unit, "kg");
    assert_eq!(result.grams().unwrap(), 5000.0);
}

#[test] // parses_message_with_comma_decimal
fn parses_message_with_comma_decimal() {
    let parser = ScaleParser::new();
    let result = parser.parse("5,30kg").expect("Should parse successfully");
    assert_eq!(result.value, 5.30);
    assert_eq!(result.unit, "kg");
}

#[test] // parses_message_with_stability_prefix
fn parses_message_with_stability_prefix() {
    let parser = ScaleParser::new();

    let st = parser.parse("ST  5.0kg").expect("Should parse ST");
    let us = parser.parse("US  5.0kg").expect("Should parse US");

    assert_eq!(st.value, 5.0);
    assert!(st.stable);

    assert_eq!(us.value, 5.0);
    assert!(!us.stable);
}

#[test] // fails_with_invalid_message
fn fails_with_invalid_message() {
    let parser = ScaleParser::new();
    let invalids = vec!["", "ERROR", "---", "?? 12", "BAD DATA", "12"]; // "12" is invalid because no unit

    for raw in invalids {
        let result = parser.parse(raw);
        assert!(result.is_err(), "Should fail on: {}", raw);
    }
}

#[test]
fn parses_attached_unit() {
    let parser = ScaleParser::new();

    let result = parser.parse("1.1g").expect("Should parse 1.1g");
    assert_eq!(result.value, 1.1);
    assert_eq!(result.unit, "g");

    let result = parser.parse("123g").expect("Should parse 123g");
    assert_eq!(result.value, 123.0);
    assert_eq!(result.grams().unwrap(), 123.0);
}

#[test]
fn converts_imperial_units() {
    let parser = ScaleParser::new();

    let lb = parser.parse("ST,GS,  1.00lb").unwrap();
    assert!((lb.grams().unwrap() - 453.59237).abs() < 1e-9);

    let oz = parser.parse("2 oz").unwrap();
    assert!((oz.grams().unwrap() - 56.69904625).abs() < 1e-9);
}
