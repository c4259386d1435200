use serde_json::Value;

const INSTRUCTIONS: &str = r#"
You are a productivity analyzer.
I will give you JSON logs of app usage.

Each entry has:
- app_name
- total_time_spent (seconds)
- longest_session (seconds)
- last_active (timestamp)

**Your tasks:**
1. Group entries by application type (e.g., all "YouTube - ..." = "YouTube", all "Visual Studio Code - ..." = "VS Code").
2. For each grouped app:
   - Split into **productive usage** and **unproductive usage** (two separate entries).
   - Decide which individual logs (window titles) are productive vs unproductive.
     Example: "YouTube - music / memes" → unproductive,
     "YouTube - tutorial / lecture / course" → productive.
   - Aggregate time separately for productive and unproductive.
   - Take the maximum longest_session for each category.
   - Use the most recent last_active for each category.
3. Summary:
   - total_time (sum of all times)
   - productive_time
   - unproductive_time
   - productivity_score = (productive_time / total_time) * 100
4. Provide 2-3 insights.
5. Give a list of single DEFINING keywords that strongly suggest if a window is productive based on your analysis for current dataset,
   and another list for unproductive windows.
   Avoid generic keywords which might imply both productive and unproductive usage or be neutral. Keep the lists concise.


**Output format (strict JSON only):**
{
  "summary": {
    "total_time": <float>,
    "productive_time": <float>,
    "unproductive_time": <float>,
    "productivity_score": <float>
  },
  "apps": [
    {
      "app_name": "YouTube",
      "productive": {
        "total_time_spent": <float>,
        "longest_session": <float>,
        "last_active": "<timestamp>"
      },
      "unproductive": {
        "total_time_spent": <float>,
        "longest_session": <float>,
        "last_active": "<timestamp>"
      }
    },
    {
      "app_name": "VS Code",
      "productive": {
        "total_time_spent": <float>,
        "longest_session": <float>,
        "last_active": "<timestamp>"
      },
      "unproductive": {
        "total_time_spent": 0,
        "longest_session": 0,
        "last_active": null
      }
    }
  ],
  "insights": [
    "<string>",
    "<string>"
  ],
  "productive_keywords": ["<string>", "<string>"],
  "unproductive_keywords": ["<string>", "<string>"]
}
"#;

/// Full prompt sent to the model: the instructions followed by the pretty-printed log.
pub fn build_prompt(log: &Value) -> String {
    let log = serde_json::to_string_pretty(log).unwrap_or_else(|_| log.to_string());
    format!("{INSTRUCTIONS}\n\nNow here is the log JSON:\n{log}")
}
