use yew::prelude::*;

use super::utils::{format_local_date, severity_class};
use crate::pages::dashboard::{Dashboard, Msg};

pub fn render_results(model: &Dashboard, ctx: &Context<Dashboard>) -> Html {
    let Some(result) = &model.result else {
        return html! {};
    };

    let confidence = result.confidence() * 100.0;
    let referral = result.class().is_some_and(|class| class.requires_referral());

    html! {
        <div class={classes!("results-container", severity_class(result.diagnosis_class()))}>
            <div class="result-header">
                <h2>
                    <i class="fa-solid fa-notes-medical"></i>
                    { format!(" {}", result.diagnosis_class()) }
                </h2>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", confidence)}></div>
                    </div>
                    <div class="meter-value">{ result.confidence_percent() }</div>
                </div>
            </div>
            <p class="result-time">{ format!("Analyzed {}", format_local_date(result.produced_at())) }</p>
            if referral {
                <p class="referral-note">
                    <i class="fa-solid fa-triangle-exclamation"></i>
                    {" Referral to an ophthalmologist is recommended."}
                </p>
            }
            <button class="analyze-btn" onclick={ctx.link().callback(|_| Msg::OpenReport)}>
                <i class="fa-solid fa-file-medical"></i>{" View full report"}
            </button>
        </div>
    }
}
