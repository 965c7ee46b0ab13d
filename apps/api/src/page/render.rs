//! HTML rendering for the review page. Pure functions of `UiState`.

use super::state::UiState;
use crate::lexicon::LexiconScore;
use crate::summarize::{AiSummary, SentimentTone};

const TITLE: &str = "AI-Powered Product Review Analyzer";
const PLACEHOLDER: &str = "Enter your product review here (Press Ctrl+Enter to analyze)";
const ACTION_LABEL: &str = "Analyze Review";
const SPINNER: &str = r#"<span class="mr-2 h-4 w-4 animate-spin" role="status" aria-label="Loading">&#8635;</span>"#;
/// Seconds before a page showing a call in flight reloads itself.
const LOADING_REFRESH_SECS: u32 = 2;

/// Keeps the rendered page in step with what the user does before the next
/// submit: the action follows the blank check, clearing the review drops the
/// shown summary, Ctrl+Enter submits, and a submit shows the loading label.
const PAGE_SCRIPT: &str = r#"    <script>
      (function () {
        var form = document.getElementById('review-form');
        var review = form.elements.review;
        var button = form.querySelector('button[type=submit]');
        review.addEventListener('input', function () {
          var blank = review.value.trim() === '';
          button.disabled = blank || form.dataset.loading === 'true';
          if (blank) {
            form.querySelectorAll('[data-sentiment]').forEach(function (panel) {
              panel.remove();
            });
          }
        });
        review.addEventListener('keydown', function (event) {
          if (event.key === 'Enter' && event.ctrlKey && !button.disabled) {
            event.preventDefault();
            form.requestSubmit();
          }
        });
        form.elements.dark.addEventListener('change', function () {
          form.elements.intent.value = 'theme';
          form.requestSubmit();
        });
        form.addEventListener('submit', function (event) {
          if (form.elements.intent.value === 'theme') {
            return;
          }
          if (form.dataset.loading === 'true') {
            event.preventDefault();
            return;
          }
          form.dataset.loading = 'true';
          button.disabled = true;
          button.innerHTML = document.getElementById('loading-label').innerHTML;
        });
      })();
    </script>
"#;

/// Light/dark class sets.
struct Palette {
    background: &'static str,
    card: &'static str,
    title: &'static str,
    description: &'static str,
    textarea: &'static str,
    panel: &'static str,
    button: &'static str,
    sun: &'static str,
    moon: &'static str,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Self {
                background: "bg-gradient-to-br from-blue-900 via-purple-900 to-pink-900",
                card: "bg-gray-800/30",
                title: "text-white",
                description: "text-blue-200",
                textarea: "bg-gray-700/50 placeholder-gray-400 text-white",
                panel: "bg-gray-700 text-white",
                button: "bg-blue-600 hover:bg-blue-700",
                sun: "text-gray-400",
                moon: "text-blue-300",
            }
        } else {
            Self {
                background: "bg-gradient-to-br from-blue-300 via-purple-300 to-pink-300",
                card: "bg-white/30",
                title: "text-gray-800",
                description: "text-blue-800",
                textarea: "bg-white/50 placeholder-gray-500 text-gray-800",
                panel: "bg-white text-gray-800",
                button: "bg-blue-500 hover:bg-blue-600",
                sun: "text-yellow-500",
                moon: "text-gray-400",
            }
        }
    }
}

/// Renders the full HTML document for `state`.
pub fn render_page(state: &UiState) -> String {
    let palette = Palette::for_mode(state.dark_mode());
    let html_class = if state.dark_mode() { "dark" } else { "" };
    let refresh = if state.loading() {
        format!(
            "\n    <meta http-equiv=\"refresh\" content=\"{LOADING_REFRESH_SECS};url=/\" />"
        )
    } else {
        String::new()
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{html_class}">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />{refresh}
    <title>{TITLE}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="min-h-screen w-screen flex items-center justify-center p-4 transition-colors duration-300 {background}">
{card}
    <template id="loading-label">{SPINNER}</template>
{PAGE_SCRIPT}  </body>
</html>"#,
        background = palette.background,
        card = render_card(state),
    )
}

/// Renders the card: header, review form, error and summary panels, action.
pub fn render_card(state: &UiState) -> String {
    let palette = Palette::for_mode(state.dark_mode());
    let checked = if state.dark_mode() { " checked" } else { "" };

    let mut panels = String::new();
    if let Some(error) = state.error() {
        panels.push_str(&render_error_panel(error));
    }
    if let Some(summary) = state.summary() {
        panels.push_str(&render_summary_panel(summary, state.lexicon(), &palette));
    }

    format!(
        r#"    <form id="review-form" method="post" action="/" data-loading="{loading}" class="w-full max-w-lg md:max-w-xl lg:max-w-2xl rounded-xl p-6 space-y-4 {card}">
      <div class="flex items-center justify-between">
        <div>
          <h1 class="text-2xl font-bold {title}"><span class="bg-gradient-to-r from-blue-500 to-purple-500 text-transparent bg-clip-text">{TITLE}</span></h1>
          <p class="{description}">Enter your review of the Product, and get an AI-generated summary!</p>
        </div>
        <label class="flex items-center space-x-2">
          <span class="h-4 w-4 {sun}">&#9728;</span>
          <input type="checkbox" name="dark" value="on" aria-label="Dark mode"{checked} />
          <span class="h-4 w-4 {moon}">&#9790;</span>
        </label>
      </div>
      <input type="hidden" name="intent" value="analyze" />
      <textarea name="review" placeholder="{PLACEHOLDER}" class="w-full min-h-[100px] rounded-md p-2 {textarea}">
{review}</textarea>
{panels}{button}
    </form>"#,
        loading = state.loading(),
        card = palette.card,
        title = palette.title,
        description = palette.description,
        sun = palette.sun,
        moon = palette.moon,
        textarea = palette.textarea,
        review = escape_html(state.review()),
        button = render_action_button(state, &palette),
    )
}

fn render_action_button(state: &UiState, palette: &Palette) -> String {
    let disabled = if state.can_submit() { "" } else { " disabled" };
    let label = if state.loading() { SPINNER } else { ACTION_LABEL };
    format!(
        r#"      <button type="submit" class="w-full rounded-md py-2 text-white {button}"{disabled}>{label}</button>"#,
        button = palette.button,
    )
}

fn render_error_panel(message: &str) -> String {
    format!(
        r#"      <div role="alert" class="rounded-md border border-red-500 bg-red-50 p-4 text-red-700">
        <h5 class="font-semibold">Error</h5>
        <p>{message}</p>
      </div>
"#,
        message = escape_html(message),
    )
}

fn render_summary_panel(
    summary: &AiSummary,
    lexicon: Option<&LexiconScore>,
    palette: &Palette,
) -> String {
    let tone = summary.tone();
    let color = tone.color();
    let glyph = match tone {
        SentimentTone::Positive => r#"<span class="h-5 w-5 text-green-500">&#128077;</span>"#,
        SentimentTone::Negative => r#"<span class="h-5 w-5 text-red-500">&#128078;</span>"#,
        SentimentTone::Neutral => r#"<span class="h-5 w-5 text-yellow-500">&bull;</span>"#,
    };

    let mut details = String::new();
    if !summary.positive_words.is_empty() || !summary.negative_words.is_empty() {
        details.push_str(
            r#"          <p class="font-semibold text-lg bg-gradient-to-r from-blue-500 to-purple-500 text-transparent bg-clip-text">Sentiment Analysis:</p>
"#,
        );
    }
    if !summary.positive_words.is_empty() {
        details.push_str(&render_word_list(
            "Positive aspects",
            "text-green-500",
            &summary.positive_words,
        ));
    }
    if !summary.negative_words.is_empty() {
        details.push_str(&render_word_list(
            "Negative aspects",
            "text-red-500",
            &summary.negative_words,
        ));
    }
    if let Some(lexicon) = lexicon {
        details.push_str(&render_lexicon_badge(lexicon));
    }

    format!(
        r#"      <div role="status" class="rounded-md border-2 p-4 transition-colors duration-300 {panel} border-{color}-500" data-sentiment="{label}">
        <div class="flex justify-between">
          <h5 class="text-xl font-bold bg-gradient-to-r from-blue-500 to-purple-500 text-transparent bg-clip-text">AI Summary</h5>
          <div class="flex items-center"><span class="mr-2 font-semibold text-{color}-500">{label}</span>{glyph}</div>
        </div>
        <p class="text-lg mb-4">{text}</p>
        <div class="space-y-2">
{details}        </div>
      </div>
"#,
        panel = palette.panel,
        label = escape_html(&summary.overall_sentiment),
        text = escape_html(&summary.summary),
    )
}

fn render_word_list(heading: &str, class: &str, words: &[String]) -> String {
    let joined = words
        .iter()
        .map(|w| escape_html(w))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"          <p class="font-medium">{heading}: <span class="{class} font-semibold">{joined}</span></p>
"#
    )
}

fn render_lexicon_badge(lexicon: &LexiconScore) -> String {
    format!(
        r#"          <p class="text-sm opacity-75" data-lexicon-score="{score}">Lexicon score: {score} ({comparative:.2} per word)</p>
"#,
        score = lexicon.score,
        comparative = lexicon.comparative,
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
