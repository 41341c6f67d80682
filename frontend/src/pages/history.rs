use client::{FetchState, HistoryRecord};
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::components::utils::{format_local_date, render_error_message, severity_class};
use crate::services::Services;

#[derive(Properties, PartialEq)]
pub struct HistoryProps {
    pub services: Services,
}

#[function_component(HistoryPage)]
pub fn history_page(props: &HistoryProps) -> Html {
    let snapshot = use_state(|| props.services.history.snapshot());

    {
        let snapshot = snapshot.clone();
        use_effect_with(props.services.clone(), move |services| {
            let subscription = {
                let snapshot = snapshot.clone();
                services
                    .history
                    .subscribe(move |latest| snapshot.set(latest.clone()))
            };
            snapshot.set(services.history.snapshot());

            let history = services.history.clone();
            let session = services.session.clone();
            spawn_local(async move { history.fetch_once(&*session).await });

            move || drop(subscription)
        });
    }

    let on_retry = {
        let services = props.services.clone();
        Callback::from(move |_: MouseEvent| {
            let history = services.history.clone();
            let session = services.session.clone();
            spawn_local(async move { history.retry(&*session).await });
        })
    };

    let body = match &snapshot.state {
        FetchState::Failed(e) => html! {
            <>
                { render_error_message(Some(e.user_message().as_str())) }
                <button class="analyze-btn" onclick={on_retry}>
                    <i class="fa-solid fa-rotate-right"></i>{" Retry"}
                </button>
                { render_table(&snapshot.records) }
            </>
        },
        FetchState::NotFetched | FetchState::Fetching if snapshot.records.is_empty() => html! {
            <div class="loading">
                <i class="fa-solid fa-spinner fa-spin"></i>
                <p>{"Loading history..."}</p>
            </div>
        },
        _ if snapshot.records.is_empty() => html! {
            <p class="empty-state">{"You have no past predictions."}</p>
        },
        _ => render_table(&snapshot.records),
    };

    html! {
        <section class="history">
            <header class="page-header">
                <h1><i class="fa-solid fa-clock-rotate-left"></i>{" Prediction History"}</h1>
            </header>
            { body }
        </section>
    }
}

fn render_table(records: &[HistoryRecord]) -> Html {
    if records.is_empty() {
        return html! {};
    }

    html! {
        <table class="history-table">
            <thead>
                <tr>
                    <th>{"Date"}</th>
                    <th>{"Diagnosis"}</th>
                    <th>{"Confidence"}</th>
                </tr>
            </thead>
            <tbody>
                { for records.iter().map(|record| html! {
                    <tr key={record.id.clone()}>
                        <td>{ format_local_date(record.recorded_at) }</td>
                        <td>
                            <span class={classes!("badge", severity_class(record.result.diagnosis_class()))}>
                                { record.result.diagnosis_class() }
                            </span>
                        </td>
                        <td>{ record.result.confidence_percent() }</td>
                    </tr>
                }) }
            </tbody>
        </table>
    }
}
