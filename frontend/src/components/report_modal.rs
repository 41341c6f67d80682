use client::Report;
use gloo_file::{Blob, ObjectUrl};
use yew::prelude::*;

use super::utils::format_local_date;

#[derive(Properties, PartialEq)]
pub struct ReportModalProps {
    pub report: Report,
    pub on_close: Callback<()>,
}

#[function_component(ReportModal)]
pub fn report_modal(props: &ReportModalProps) -> Html {
    let report = &props.report;
    let on_close = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };
    // Revoked when the modal unmounts or the report changes.
    let download_url = use_memo(report.clone(), |report| {
        ObjectUrl::from(Blob::new_with_options(
            report.to_text().as_str(),
            Some("text/plain;charset=utf-8"),
        ))
    });
    let file_name = report.file_name();

    // Clicks inside the card must not reach the backdrop.
    let stop = Callback::from(|e: MouseEvent| e.stop_propagation());

    let row = |label: &str, value: String| {
        html! {
            <tr>
                <th>{ label.to_string() }</th>
                <td>{ value }</td>
            </tr>
        }
    };

    html! {
        <div class="modal-backdrop" onclick={on_close.clone()}>
            <div class="modal report" onclick={stop}>
                <header class="report-header">
                    <h2><i class="fa-solid fa-file-medical"></i>{" Diabetic Retinopathy Screening Report"}</h2>
                    <button class="close-btn" title="Close" onclick={on_close}>
                        <i class="fa-solid fa-times"></i>
                    </button>
                </header>

                <h3>{"Patient"}</h3>
                <table class="report-table"><tbody>
                    { row("Name", report.patient_name.clone()) }
                    { row("Patient ID", report.patient_id.clone()) }
                    { row("Age", report.patient_age.map(|age| age.to_string()).unwrap_or_else(|| "-".into())) }
                    { row("Gender", report.patient_gender.clone().unwrap_or_else(|| "-".into())) }
                    { row("Email", report.patient_email.clone().unwrap_or_else(|| "-".into())) }
                </tbody></table>

                <h3>{"Findings"}</h3>
                <table class="report-table"><tbody>
                    { row("Diagnosis", report.diagnosis.clone()) }
                    { row("Confidence", report.confidence.clone()) }
                    { row("Referral", if report.referral_recommended { "Recommended".into() } else { "Not required".into() }) }
                    { row("Generated", format_local_date(report.generated_at)) }
                </tbody></table>

                <p class="disclaimer">{ report.disclaimer }</p>

                <footer class="report-actions">
                    <a class="analyze-btn" href={download_url.to_string()} download={file_name}>
                        <i class="fa-solid fa-download"></i>{" Download report"}
                    </a>
                </footer>
            </div>
        </div>
    }
}
