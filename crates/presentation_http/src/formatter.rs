//! Plain-text rendering of query outcomes
//!
//! The output is meant for chat messages: `*bold*` markers, short lines,
//! never longer than [`MAX_MESSAGE_CHARS`] characters.

use domain::{
    LineCandidate, QueryOutcome, QueryPayload, StopCandidate, UpstreamFailureKind,
};
use serde_json::Value;

/// Longest rendered message, in characters, before the ellipsis
pub const MAX_MESSAGE_CHARS: usize = 1200;

/// Most list entries rendered for lines and stops
pub const MAX_LIST_ITEMS: usize = 10;

/// Render any outcome, truncated
pub fn render(outcome: &QueryOutcome) -> String {
    let text = match outcome {
        QueryOutcome::Success { payload, degraded } => render_payload(payload, *degraded),
        QueryOutcome::LineNotFound { line } => format!("Não encontrei a linha \"{line}\"."),
        QueryOutcome::StopNotFound { stop } => format!("Não encontrei a parada \"{stop}\"."),
        QueryOutcome::LineNotFoundForStop { line, stop } => format!(
            "Não encontrei a linha \"{line}\" para a parada {}.",
            stop.label()
        ),
        QueryOutcome::FeatureDisabled { .. } => {
            "Planejamento de rotas não está disponível no momento.".to_string()
        },
        QueryOutcome::UpstreamFailure { kind, .. } => failure_message(*kind).to_string(),
        QueryOutcome::Help => format_help(),
        QueryOutcome::Unrecognized => format!("Não entendi o pedido.\n\n{}", format_help()),
    };
    truncate(&text, MAX_MESSAGE_CHARS)
}

fn render_payload(payload: &QueryPayload, degraded: bool) -> String {
    match payload {
        QueryPayload::Lines { term, lines } => format_lines(term, lines),
        QueryPayload::Positions { line, data } => format_positions(line, data),
        QueryPayload::Predictions { stop, line, data } => {
            format_predictions(stop, line.as_ref(), data, degraded)
        },
        QueryPayload::LineStops { line, stops } => format_line_stops(line, stops),
        QueryPayload::Route {
            origin,
            destination,
            data,
        } => format_route(origin, destination, data),
    }
}

fn failure_message(kind: UpstreamFailureKind) -> &'static str {
    match kind {
        UpstreamFailureKind::CredentialMissing | UpstreamFailureKind::AuthenticationRejected => {
            "O acesso à SPTrans não está configurado corretamente."
        },
        UpstreamFailureKind::Transient => {
            "A SPTrans não respondeu a tempo. Tente novamente em instantes."
        },
        UpstreamFailureKind::NotFound => "Nada encontrado para essa consulta.",
        UpstreamFailureKind::UpstreamError | UpstreamFailureKind::InvalidResponse => {
            "Não foi possível consultar o serviço agora."
        },
    }
}

/// Cut to `max` characters, appending an ellipsis when anything was dropped
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Usage examples
pub fn format_help() -> String {
    [
        "Exemplos:",
        "- quando chega 701U-10 no ponto 340015345?",
        "- posição 477P",
        "- linha 701U",
        "- rota Av Paulista 1000 até Terminal Jabaquara",
    ]
    .join("\n")
}

/// Line search results
pub fn format_lines(term: &str, lines: &[LineCandidate]) -> String {
    if lines.is_empty() {
        return format!("Nenhuma linha encontrada para \"{term}\".");
    }

    let entries: Vec<String> = lines
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(|l| {
            format!(
                "*{}* {} → {}",
                l.label(),
                l.origin_description,
                l.destination_description
            )
        })
        .collect();

    format!(
        "Linhas encontradas para \"{term}\":\n\n{}",
        entries.join("\n")
    )
}

/// Vehicles of a line, from either `vs` or `l[0].vs`
fn vehicles(data: &Value) -> &[Value] {
    data.get("vs")
        .and_then(Value::as_array)
        .or_else(|| data.pointer("/l/0/vs").and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice)
}

/// String or number field as text
fn text_field<'a>(value: &'a Value, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str().into()),
        Value::Number(n) => Some(n.to_string().into()),
        _ => None,
    }
}

/// Vehicle positions of a line
pub fn format_positions(line: &LineCandidate, data: &Value) -> String {
    let label = line.label();
    let vehicles = vehicles(data);
    if vehicles.is_empty() {
        return format!("Não há veículos da linha {label} em circulação no momento.");
    }

    let entries: Vec<String> = vehicles
        .iter()
        .enumerate()
        .map(|(idx, v)| {
            let prefix = text_field(v, "p").unwrap_or_else(|| "N/A".into());
            let accessible = if v.get("a").and_then(Value::as_bool) == Some(true) {
                " (acessível)"
            } else {
                ""
            };
            format!("{}. Ônibus {prefix}{accessible}", idx + 1)
        })
        .collect();

    format!(
        "*Linha {label}* · {} veículo(s)\n\n{}",
        vehicles.len(),
        entries.join("\n")
    )
}

/// Arrival predictions at a stop
pub fn format_predictions(
    stop: &StopCandidate,
    line: Option<&LineCandidate>,
    data: &Value,
    degraded: bool,
) -> String {
    let stop_label = stop.label();
    let lines = data
        .pointer("/p/l")
        .and_then(Value::as_array)
        .or_else(|| data.get("l").and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice);

    let mut text = match line {
        Some(l) if !degraded => format!("Previsão · Linha {} na parada {stop_label}", l.label()),
        _ => format!("Previsão · Parada {stop_label}"),
    };

    if degraded {
        if let Some(l) = line {
            text.push_str(&format!(
                "\n(sem previsão específica para a linha {}; mostrando todas as linhas da parada)",
                l.label()
            ));
        }
    }

    if lines.is_empty() {
        text.push_str("\n\nNenhuma previsão disponível agora.");
        return text;
    }

    let entries: Vec<String> = lines
        .iter()
        .map(|l| {
            let code = text_field(l, "c").unwrap_or_else(|| "N/A".into());
            let destination = text_field(l, "lt1")
                .or_else(|| text_field(l, "lt0"))
                .unwrap_or_default();
            let arrivals: Vec<String> = l
                .get("vs")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice)
                .iter()
                .map(|v| {
                    format!(
                        "{} (veículo {})",
                        text_field(v, "t").unwrap_or_else(|| "?".into()),
                        text_field(v, "p").unwrap_or_else(|| "?".into())
                    )
                })
                .collect();

            if arrivals.is_empty() {
                format!("*{code}* {destination} · sem previsão")
            } else {
                format!("*{code}* {destination}\nchega às {}", arrivals.join(", "))
            }
        })
        .collect();

    text.push_str("\n\n");
    text.push_str(&entries.join("\n\n"));
    text
}

/// Stops served by a line
pub fn format_line_stops(line: &LineCandidate, stops: &[StopCandidate]) -> String {
    let label = line.label();
    if stops.is_empty() {
        return format!("Nenhuma parada encontrada para a linha {label}.");
    }

    let entries: Vec<String> = stops
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(|s| format!("• {}", s.label()))
        .collect();

    let mut text = format!("*Linha {label}* · {} parada(s)\n\n{}", stops.len(), entries.join("\n"));
    if stops.len() > MAX_LIST_ITEMS {
        text.push_str(&format!("\n… e mais {}", stops.len() - MAX_LIST_ITEMS));
    }
    text
}

/// Bus route summary from a Directions answer
pub fn format_route(origin: &str, destination: &str, data: &Value) -> String {
    let Some(leg) = data.pointer("/routes/0/legs/0") else {
        return format!("Não encontrei rota de ônibus entre \"{origin}\" e \"{destination}\".");
    };

    let duration = leg.pointer("/duration/text").and_then(Value::as_str).unwrap_or_default();
    let distance = leg.pointer("/distance/text").and_then(Value::as_str).unwrap_or_default();

    let steps: Vec<String> = leg
        .get("steps")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
        .iter()
        .filter_map(|step| step.get("transit_details"))
        .map(|td| {
            let number = td
                .pointer("/line/short_name")
                .or_else(|| td.pointer("/line/name"))
                .and_then(Value::as_str)
                .unwrap_or("ônibus");
            let headsign = td
                .get("headsign")
                .and_then(Value::as_str)
                .map(|h| format!(" ({h})"))
                .unwrap_or_default();
            let agency = td
                .pointer("/line/agencies/0/name")
                .and_then(Value::as_str)
                .map(|a| format!(" · {a}"))
                .unwrap_or_default();
            let from = td.pointer("/departure_stop/name").and_then(Value::as_str).unwrap_or_default();
            let to = td.pointer("/arrival_stop/name").and_then(Value::as_str).unwrap_or_default();
            let arrival = td
                .pointer("/arrival_time/text")
                .and_then(Value::as_str)
                .map(|t| format!(", chega {t}"))
                .unwrap_or_default();

            format!("• {number}{headsign}{agency}\n  de: {from}\n  até: {to}{arrival}")
        })
        .collect();

    let body = if steps.is_empty() {
        "(sem detalhes de ônibus nos passos)".to_string()
    } else {
        steps.join("\n")
    };

    format!("Rota (transporte público) · {duration}, {distance}\n{origin} → {destination}\n{body}")
}
