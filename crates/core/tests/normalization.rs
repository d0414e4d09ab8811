//! Integration tests for discount normalisation.

use jiff::Timestamp;
use rust_decimal::Decimal;
use testresult::TestResult;

use trellis::prelude::*;

fn context() -> TestResult<NormalizeContext> {
    Ok(NormalizeContext::at("2026-01-31T12:00:00Z".parse::<Timestamp>()?))
}

#[test]
fn every_hundredth_of_a_percent_round_trips() -> TestResult {
    let ctx = context()?;
    let tolerance = Decimal::new(1, 2);

    for hundredths in 1..=10_000 {
        let raw = Decimal::new(hundredths, 2);
        let normalized = normalize(&DiscountSpec::percentage("Sweep", raw), &ctx)?;
        let encoded = normalized.encoded_value().value();

        assert!(encoded > Decimal::ZERO && encoded <= Decimal::ONE, "{raw} encoded to {encoded}");
        assert!(
            ((encoded * Decimal::ONE_HUNDRED).round_dp(2) - raw).abs() <= tolerance,
            "{raw} encoded to {encoded}"
        );
    }

    Ok(())
}

#[test]
fn thousandths_of_a_percent_stay_within_tolerance() -> TestResult {
    let ctx = context()?;

    for thousandths in (5..=100_000).step_by(7) {
        let raw = Decimal::new(thousandths, 3);
        let normalized = normalize(&DiscountSpec::percentage("Sweep", raw), &ctx)?;

        assert!(
            (normalized.encoded_value().rederive() - raw).abs() <= Decimal::new(1, 2),
            "{raw} drifted"
        );
    }

    Ok(())
}

#[test]
fn fixed_amounts_encode_to_cents() -> TestResult {
    let ctx = context()?;

    for (raw, expected) in [
        (Decimal::new(5, 0), Decimal::new(500, 2)),
        (Decimal::new(12_345, 3), Decimal::new(1235, 2)),
        (Decimal::new(1, 2), Decimal::new(1, 2)),
        (Decimal::new(99_999, 1), Decimal::new(999_990, 2)),
    ] {
        let normalized = normalize(&DiscountSpec::fixed("Fixed", raw), &ctx)?;

        assert_eq!(normalized.encoded_value().value(), expected, "{raw}");
    }

    Ok(())
}

#[test]
fn automatic_and_code_representations_follow_auto_apply() -> TestResult {
    let ctx = context()?;

    let automatic = normalize(
        &DiscountSpec::percentage("Auto", Decimal::new(10, 0)).auto_apply(true),
        &ctx,
    )?;

    let code = normalize(&DiscountSpec::fixed("Code", Decimal::new(20, 0)), &ctx)?;

    assert!(automatic.representation().is_automatic());
    assert!(automatic.code().is_none());
    assert_eq!(code.code().map(DiscountCode::as_str), Some("OFF200000"));

    Ok(())
}
