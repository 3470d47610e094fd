//! Translation prompt construction.

/// Build the single-turn prompt asking for a full translation of one essay.
///
/// The first line of the model's answer must be a level-1 Markdown heading;
/// downstream tooling reads it back as the translated title.
pub fn build_prompt(title: &str, text: &str, target_language: &str) -> String {
    format!(
        r##"Below is the full text of Paul Graham's essay "{title}".
Translate it into {target_language} so that native {target_language} readers find it natural and easy to read.

1. Reply with the translated essay only. No greetings, acknowledgements, or commentary.
2. Use a polite, formal register.
3. Write the title as "{target_language} title (Original English title)", keeping the English original in parentheses.
4. Translate English terms that {target_language} readers commonly use directly; otherwise keep the English term alongside the translation. Do not annotate terms that readers interested in startups already know.
5. Output Markdown. The first line must be the title as a level-1 heading, e.g. "# Title".
6. Footnote markers of the form [^n] (n a natural number) must follow the preceding sentence directly, with no space or line break in between.
7. Favor the author's intent over idiomatic phrasing when the two conflict.
8. Follow this layout. Items marked optional appear only if the original has them.

--- layout start ---
# {{title}}

{{promotional line such as "Want to start a startup? Get funded by Y Combinator." optional}}

{{month and year of publication}}

## {{subheading, optional}}

{{A sentence.}}{{[^n] footnote marker, optional}} {{Another sentence.}}

{{acknowledgements, placed before the footnotes, optional}}

{{[^n]: text of footnote n. The colon is required. Footnote definitions go at the very end, without a separate section heading. optional}}
--- layout end ---

--- original start ---
{text}
--- original end ---
"##
    )
}
