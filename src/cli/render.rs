//! Report rendering

use std::io::Write;
use storeprobe_core::{ProbeReport, ProbeResult};

use crate::cli::Result;

/// One JSON object per line
pub fn render_json<W: Write>(out: &mut W, report: &ProbeReport) -> Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

/// Human-readable block for run `index` of `total`
pub fn render_text<W: Write>(
    out: &mut W,
    report: &ProbeReport,
    index: usize,
    total: usize,
) -> Result<()> {
    let status = match &report.result {
        ProbeResult::Success { .. } => "OK".to_string(),
        ProbeResult::Failure { kind, .. } => format!("FAILED: {kind}"),
    };
    writeln!(
        out,
        "[{index}/{total}] probe {} {status} ({} ms)",
        report.probe_id, report.elapsed_ms
    )?;

    for step in &report.steps {
        let mark = if step.succeeded { "ok" } else { "failed" };
        writeln!(
            out,
            "  {:<18}{:>6} ms  {mark}",
            step.step.to_string(),
            step.elapsed_ms
        )?;
    }

    match &report.result {
        ProbeResult::Success {
            message,
            echoed_data,
        } => {
            writeln!(out, "  {message}")?;
            writeln!(out, "  echoed: {echoed_data}")?;
        }
        ProbeResult::Failure {
            message,
            error_code,
            error_detail,
            recommendation,
            notice,
            ..
        } => {
            writeln!(out, "  message: {message}")?;
            if let Some(code) = error_code {
                writeln!(out, "  code: {code}")?;
            }
            if let Some(detail) = error_detail {
                writeln!(out, "  detail: {detail}")?;
            }
            if let Some(recommendation) = recommendation {
                writeln!(out, "  recommendation: {recommendation}")?;
            }
            if let Some(notice) = notice {
                writeln!(out, "  note: {notice}")?;
            }
        }
    }
    Ok(())
}
